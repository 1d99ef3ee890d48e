//! Fixture catalog contents shared by the end-to-end tests.

pub const BLUE_TRAIN_TITLE: &str = "Blue Train";
pub const GIANT_STEPS_TITLE: &str = "Giant Steps";
pub const JERU_TITLE: &str = "Jeru";
pub const MARSHAL_MATTERS_TITLE: &str = "Marshal Matters";

pub const COLTRANE: &str = "John Coltrane";
pub const MULLIGAN: &str = "Gerry Mulligan";
pub const EMINEM: &str = "Eminem";

pub const BLUE_TRAIN_QUANTITY: i64 = 5;
pub const GIANT_STEPS_QUANTITY: i64 = 3;
pub const JERU_QUANTITY: i64 = 2;
pub const MARSHAL_MATTERS_QUANTITY: i64 = 6;

pub const MARSHAL_MATTERS_PRICE_CENTS: i64 = 2500;

pub const ALBUM_COUNT: usize = 4;
#[allow(dead_code)]
pub const SONG_COUNT: usize = 7;

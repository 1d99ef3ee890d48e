//! SQLite schema of the recordings catalog.
//!
//! Identifiers are integer rowids assigned by the store. Prices are whole
//! cents.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

/// Albums on sale, with the number of copies on hand.
const ALBUMS_TABLE: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!(
            "price_cents",
            &SqlType::Integer,
            non_null = true,
            check = Some("price_cents >= 0")
        ),
        sqlite_column!(
            "quantity",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0"),
            check = Some("quantity >= 0")
        ),
    ],
    indices: &[
        ("idx_albums_title", "title"),
        ("idx_albums_artist", "artist"),
    ],
};

const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "album_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "albums",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Restrict,
            })
        ),
    ],
    indices: &[("idx_songs_album", "album_id")],
};

/// Purchase ledger, one row per committed order.
const ORDERS_TABLE: Table = Table {
    name: "orders",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "album_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "albums",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Restrict,
            })
        ),
        sqlite_column!(
            "quantity",
            &SqlType::Integer,
            non_null = true,
            check = Some("quantity > 0")
        ),
        sqlite_column!("unit_price_cents", &SqlType::Integer, non_null = true),
        sqlite_column!("customer", &SqlType::Text, non_null = true),
        sqlite_column!(
            "placed_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_orders_album", "album_id")],
};

pub const CATALOG_SCHEMA: VersionedSchema = VersionedSchema {
    version: 0,
    tables: &[ALBUMS_TABLE, SONGS_TABLE, ORDERS_TABLE],
};

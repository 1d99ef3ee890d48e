//! Test database setup

use super::constants::*;
use recordings_catalog::catalog_store::{AlbumId, Catalog, NewAlbum, NewSong, Price};
use recordings_catalog::{Session, SessionConfig, SessionProvider, CATALOG_SCHEMA};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct TestCatalog {
    pub provider: SessionProvider,
    pub catalog: Catalog,
    pub blue_train: AlbumId,
    pub giant_steps: AlbumId,
    pub jeru: AlbumId,
    pub marshal_matters: AlbumId,
    _temp_dir: TempDir,
}

impl TestCatalog {
    /// Creates a fresh database with the fixture albums and songs.
    pub fn create() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = SessionConfig::new(temp_dir.path().join("catalog.db"))
            .with_busy_timeout(Duration::from_secs(10));
        let provider = SessionProvider::new(config);
        provider
            .initialize(&CATALOG_SCHEMA)
            .expect("Failed to initialize catalog schema");
        let catalog = Catalog::new(Arc::new(provider.open().expect("Failed to open session")));

        let add = |title: &str, artist: &str, cents: i64, quantity: i64, songs: &[&str]| {
            let album_id = catalog
                .writer
                .add_album(&NewAlbum {
                    title: title.to_string(),
                    artist: artist.to_string(),
                    price: Price::from_cents(cents),
                    quantity,
                })
                .expect("Failed to add album");
            for song in songs {
                catalog
                    .writer
                    .add_song(&NewSong {
                        name: song.to_string(),
                        album_id,
                    })
                    .expect("Failed to add song");
            }
            album_id
        };

        let blue_train = add(
            BLUE_TRAIN_TITLE,
            COLTRANE,
            5699,
            BLUE_TRAIN_QUANTITY,
            &["Blue Train", "Moment's Notice"],
        );
        let giant_steps = add(
            GIANT_STEPS_TITLE,
            COLTRANE,
            6399,
            GIANT_STEPS_QUANTITY,
            &["Giant Steps", "Naima"],
        );
        let jeru = add(JERU_TITLE, MULLIGAN, 1799, JERU_QUANTITY, &["Capricious"]);
        let marshal_matters = add(
            MARSHAL_MATTERS_TITLE,
            EMINEM,
            MARSHAL_MATTERS_PRICE_CENTS,
            MARSHAL_MATTERS_QUANTITY,
            &["Stan", "The Way I Am"],
        );

        Self {
            provider,
            catalog,
            blue_train,
            giant_steps,
            jeru,
            marshal_matters,
            _temp_dir: temp_dir,
        }
    }

    /// Opens another session against the same database.
    pub fn open_session(&self) -> Arc<Session> {
        Arc::new(self.provider.open().expect("Failed to open session"))
    }

    /// A catalog backed by its own session.
    pub fn new_catalog(&self) -> Catalog {
        Catalog::new(self.open_session())
    }
}

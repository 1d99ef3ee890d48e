//! Plain inserts into the catalog.

use super::error::CatalogError;
use super::models::*;
use super::validation::{validate_new_album, validate_new_song};
use crate::session::Session;
use rusqlite::params;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct CatalogWriter {
    session: Arc<Session>,
}

impl CatalogWriter {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Inserts an album and returns its store-assigned id.
    pub fn add_album(&self, album: &NewAlbum) -> Result<AlbumId, CatalogError> {
        const OPERATION: &str = "add_album";
        validate_new_album(album).map_err(CatalogError::invalid_input(OPERATION))?;

        let outcome = self
            .session
            .exec(
                "INSERT INTO albums (title, artist, price_cents, quantity) VALUES (?1, ?2, ?3, ?4)",
                params![&album.title, &album.artist, album.price, album.quantity],
            )
            .map_err(CatalogError::store(OPERATION))?;

        debug!("Added album {} '{}'", outcome.last_insert_id, album.title);
        Ok(outcome.last_insert_id)
    }

    /// Inserts a song. The owning album must exist.
    pub fn add_song(&self, song: &NewSong) -> Result<SongId, CatalogError> {
        const OPERATION: &str = "add_song";
        validate_new_song(song).map_err(CatalogError::invalid_input(OPERATION))?;

        let outcome = self
            .session
            .exec(
                "INSERT INTO songs (name, album_id) VALUES (?1, ?2)",
                params![&song.name, song.album_id],
            )
            .map_err(CatalogError::store(OPERATION))?;

        debug!(
            "Added song {} '{}' to album {}",
            outcome.last_insert_id, song.name, song.album_id
        );
        Ok(outcome.last_insert_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::{CatalogReader, CATALOG_SCHEMA};
    use crate::session::{SessionConfig, SessionProvider};
    use tempfile::TempDir;

    fn create_tmp_catalog() -> (CatalogWriter, CatalogReader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let provider = SessionProvider::new(SessionConfig::new(temp_dir.path().join("test.db")));
        provider.initialize(&CATALOG_SCHEMA).unwrap();
        let session = Arc::new(provider.open().unwrap());
        (
            CatalogWriter::new(session.clone()),
            CatalogReader::new(session),
            temp_dir,
        )
    }

    fn new_album(title: &str) -> NewAlbum {
        NewAlbum {
            title: title.to_string(),
            artist: "Sarah Vaughan".to_string(),
            price: Price::from_cents(3498),
            quantity: 4,
        }
    }

    #[test]
    fn album_ids_increase() {
        let (writer, reader, _temp_dir) = create_tmp_catalog();

        let first = writer.add_album(&new_album("Sarah Vaughan")).unwrap();
        let second = writer.add_album(&new_album("Sassy")).unwrap();
        assert!(first > 0);
        assert!(second > first);

        let stored = reader.get_by_id(second).unwrap();
        assert_eq!(stored.title, "Sassy");
        assert_eq!(stored.quantity, 4);
    }

    #[test]
    fn invalid_album_is_rejected_before_insert() {
        let (writer, reader, _temp_dir) = create_tmp_catalog();

        let err = writer.add_album(&new_album("")).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput { .. }));
        assert!(reader.get_combined().unwrap().0.is_empty());
    }

    #[test]
    fn song_is_attached_to_album() {
        let (writer, reader, _temp_dir) = create_tmp_catalog();
        let album_id = writer.add_album(&new_album("Sarah Vaughan")).unwrap();

        let song_id = writer
            .add_song(&NewSong {
                name: "Lullaby of Birdland".to_string(),
                album_id,
            })
            .unwrap();

        let songs = reader.list_songs_for_album(album_id).unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id, song_id);
    }

    #[test]
    fn song_for_missing_album_is_a_store_error() {
        let (writer, _reader, _temp_dir) = create_tmp_catalog();

        let err = writer
            .add_song(&NewSong {
                name: "Safire".to_string(),
                album_id: 8,
            })
            .unwrap_err();
        assert!(matches!(err, CatalogError::Store { .. }));
    }
}

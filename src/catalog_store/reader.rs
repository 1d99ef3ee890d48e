//! Read-only catalog queries.

use super::error::CatalogError;
use super::models::*;
use crate::session::{ResultSetError, Session};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use std::sync::Arc;

const COMBINED_QUERY: &str = "SELECT id, title, artist, price_cents, quantity FROM albums ORDER BY id;
     SELECT id, name, album_id FROM songs ORDER BY id;";

pub(crate) fn parse_album_row(row: &Row) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        price: row.get(3)?,
        quantity: row.get(4)?,
    })
}

pub(crate) fn parse_song_row(row: &Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        name: row.get(1)?,
        album_id: row.get(2)?,
    })
}

pub(crate) fn parse_order_row(row: &Row) -> rusqlite::Result<Order> {
    let placed_at: i64 = row.get(5)?;
    Ok(Order {
        id: row.get(0)?,
        album_id: row.get(1)?,
        quantity: row.get(2)?,
        unit_price: row.get(3)?,
        customer: row.get(4)?,
        placed_at: DateTime::<Utc>::from_timestamp(placed_at, 0).ok_or(
            rusqlite::Error::IntegralValueOutOfRange(5, placed_at),
        )?,
    })
}

/// Stateless reader over a shared session.
#[derive(Clone)]
pub struct CatalogReader {
    session: Arc<Session>,
}

impl CatalogReader {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn get_by_id(&self, id: AlbumId) -> Result<Album, CatalogError> {
        const OPERATION: &str = "get_album_by_id";
        self.session
            .query_row_opt(
                "SELECT id, title, artist, price_cents, quantity FROM albums WHERE id = ?1",
                params![id],
                parse_album_row,
            )
            .map_err(CatalogError::store(OPERATION))?
            .ok_or_else(|| CatalogError::NotFound {
                operation: OPERATION,
                entity: "album",
                key: id.to_string(),
            })
    }

    /// Albums by `artist`, oldest first. No match is an empty list, not an error.
    pub fn get_by_artist(&self, artist: &str) -> Result<Vec<Album>, CatalogError> {
        self.session
            .query(
                "SELECT id, title, artist, price_cents, quantity FROM albums WHERE artist = ?1 ORDER BY id",
                params![artist],
                parse_album_row,
            )
            .map_err(CatalogError::store("get_albums_by_artist"))
    }

    /// All albums and all songs, fetched with one two-statement query.
    pub fn get_combined(&self) -> Result<(Vec<Album>, Vec<Song>), CatalogError> {
        self.read_two_sets(COMBINED_QUERY, parse_album_row, parse_song_row)
            .map_err(|e| CatalogError::from_result_sets("get_combined", e))
    }

    /// Reads exactly two result sets from `sql`, the first through
    /// `first`, the second through `second`.
    fn read_two_sets<A, B, FA, FB>(
        &self,
        sql: &str,
        first: FA,
        second: FB,
    ) -> Result<(Vec<A>, Vec<B>), ResultSetError>
    where
        FA: FnMut(&Row<'_>) -> rusqlite::Result<A>,
        FB: FnMut(&Row<'_>) -> rusqlite::Result<B>,
    {
        self.session.query_multi(sql, |sets| {
            if !sets.next_result_set()? {
                return Err(ResultSetError::Protocol {
                    result_set: 0,
                    reason: "query produced no result set",
                });
            }
            let first_rows = sets.collect_rows(first)?;

            if !sets.next_result_set()? {
                return Err(ResultSetError::Protocol {
                    result_set: 1,
                    reason: "query produced a single result set, expected two",
                });
            }
            let second_rows = sets.collect_rows(second)?;

            if sets.next_result_set()? {
                return Err(ResultSetError::Protocol {
                    result_set: 2,
                    reason: "query produced more than two result sets",
                });
            }
            Ok((first_rows, second_rows))
        })
    }

    pub fn list_songs_for_album(&self, album_id: AlbumId) -> Result<Vec<Song>, CatalogError> {
        self.session
            .query(
                "SELECT id, name, album_id FROM songs WHERE album_id = ?1 ORDER BY id",
                params![album_id],
                parse_song_row,
            )
            .map_err(CatalogError::store("list_songs_for_album"))
    }

    pub fn get_order(&self, id: OrderId) -> Result<Order, CatalogError> {
        const OPERATION: &str = "get_order";
        self.session
            .query_row_opt(
                "SELECT id, album_id, quantity, unit_price_cents, customer, placed_at FROM orders WHERE id = ?1",
                params![id],
                parse_order_row,
            )
            .map_err(CatalogError::store(OPERATION))?
            .ok_or_else(|| CatalogError::NotFound {
                operation: OPERATION,
                entity: "order",
                key: id.to_string(),
            })
    }

    pub fn list_orders_for_album(&self, album_id: AlbumId) -> Result<Vec<Order>, CatalogError> {
        self.session
            .query(
                "SELECT id, album_id, quantity, unit_price_cents, customer, placed_at FROM orders WHERE album_id = ?1 ORDER BY id",
                params![album_id],
                parse_order_row,
            )
            .map_err(CatalogError::store("list_orders_for_album"))
    }
}

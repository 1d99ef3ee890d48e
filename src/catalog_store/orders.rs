//! Order transaction engine.
//!
//! An order takes copies of an album out of stock and records the purchase in
//! the `orders` ledger. Both happen in one immediate transaction: either the
//! stock decrement and the ledger row are committed together, or the catalog is
//! left exactly as it was.
//!
//! The stock check and the decrement are collapsed into a single conditional
//! `UPDATE ... WHERE quantity >= ?`, so two concurrent orders can never drive
//! the quantity below zero, independently of the isolation level.

use super::error::CatalogError;
use super::models::*;
use super::validation::validate_order_request;
use crate::session::{Deadline, Session, Tx};
use rusqlite::params;
use std::sync::Arc;
use tracing::{debug, info, warn};

const OPERATION: &str = "create_order";

#[derive(Clone)]
pub struct OrderEngine {
    session: Arc<Session>,
}

impl OrderEngine {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Buys `quantity` copies of the album titled `album_title` and records
    /// `entry` in the ledger. Returns the id of the new order.
    ///
    /// If several albums share the title the oldest one is used. On any error
    /// the transaction has been rolled back by the time this returns.
    pub fn create_order(
        &self,
        deadline: &Deadline,
        album_title: &str,
        quantity: u32,
        entry: &NewOrder,
    ) -> Result<OrderId, CatalogError> {
        validate_order_request(album_title, quantity, entry)
            .map_err(CatalogError::invalid_input(OPERATION))?;
        check_deadline(deadline, "begin")?;

        let mut tx = self.session.begin_tx(deadline).map_err(|source| {
            CatalogError::at_step(OPERATION, "begin", deadline, source, |source| {
                CatalogError::TransactionBeginFailed {
                    operation: OPERATION,
                    source,
                }
            })
        })?;

        let result = (|| -> Result<OrderId, CatalogError> {
            let order_id = Self::place_order(&tx, deadline, album_title, quantity, entry)?;
            check_deadline(deadline, "commit")?;
            tx.commit().map_err(|source| {
                CatalogError::at_step(OPERATION, "commit", deadline, source, |source| {
                    CatalogError::CommitFailed {
                        operation: OPERATION,
                        source,
                    }
                })
            })?;
            Ok(order_id)
        })();

        // Always issued; a no-op once the commit went through.
        if let Err(rollback_err) = tx.rollback() {
            match &result {
                Err(e) => warn!(
                    "Rollback after failed order for '{}' failed: {} (original error: {})",
                    album_title, rollback_err, e
                ),
                Ok(_) => warn!("Rollback after committed order failed: {}", rollback_err),
            }
        }

        match &result {
            Ok(order_id) => info!(
                "Order {} committed: {} x '{}' for {}",
                order_id, quantity, album_title, entry.customer
            ),
            Err(e) => debug!("Order for {} x '{}' rejected: {}", quantity, album_title, e),
        }
        result
    }

    fn place_order(
        tx: &Tx<'_>,
        deadline: &Deadline,
        album_title: &str,
        quantity: u32,
        entry: &NewOrder,
    ) -> Result<OrderId, CatalogError> {
        check_deadline(deadline, "availability check")?;
        let (album_id, available) = tx
            .query_row_opt(
                "SELECT id, quantity FROM albums WHERE title = ?1 ORDER BY id LIMIT 1",
                params![album_title],
                |r| Ok((r.get::<_, AlbumId>(0)?, r.get::<_, i64>(1)?)),
            )
            .map_err(|source| {
                CatalogError::at_step(
                    OPERATION,
                    "availability check",
                    deadline,
                    source,
                    CatalogError::store(OPERATION),
                )
            })?
            .ok_or_else(|| CatalogError::NotFound {
                operation: OPERATION,
                entity: "album",
                key: album_title.to_string(),
            })?;

        if available < i64::from(quantity) {
            return Err(insufficient_stock(album_title, quantity, available));
        }

        let unit_price =
            Self::reserve_stock(tx, deadline, album_id, album_title, quantity, available)?;

        check_deadline(deadline, "order insert")?;
        let outcome = tx
            .exec(
                "INSERT INTO orders (album_id, quantity, unit_price_cents, customer) VALUES (?1, ?2, ?3, ?4)",
                params![album_id, quantity, unit_price, &entry.customer],
            )
            .map_err(|source| write_failure("order insert", deadline, source))?;

        Ok(outcome.last_insert_id)
    }

    /// Takes `quantity` copies off the album's stock in one conditional write
    /// and returns the unit price. The write matches no row when the stock
    /// dropped below `quantity` since `available` was read.
    fn reserve_stock(
        tx: &Tx<'_>,
        deadline: &Deadline,
        album_id: AlbumId,
        album_title: &str,
        quantity: u32,
        available: i64,
    ) -> Result<Price, CatalogError> {
        check_deadline(deadline, "stock decrement")?;
        let unit_price: Price = tx
            .query_row_opt(
                "UPDATE albums SET quantity = quantity - ?1 WHERE id = ?2 AND quantity >= ?1 RETURNING price_cents",
                params![quantity, album_id],
                |r| r.get(0),
            )
            .map_err(|source| write_failure("stock decrement", deadline, source))?
            .ok_or_else(|| insufficient_stock(album_title, quantity, available))?;
        debug!(
            "Reserved {} of {} copies of album {}",
            quantity, available, album_id
        );
        Ok(unit_price)
    }
}

fn insufficient_stock(album_title: &str, quantity: u32, available: i64) -> CatalogError {
    CatalogError::InsufficientStock {
        operation: OPERATION,
        title: album_title.to_string(),
        requested: quantity,
        available,
    }
}

fn check_deadline(deadline: &Deadline, step: &'static str) -> Result<(), CatalogError> {
    if deadline.is_expired() {
        return Err(CatalogError::DeadlineExceeded {
            operation: OPERATION,
            step,
        });
    }
    Ok(())
}

fn write_failure(step: &'static str, deadline: &Deadline, source: rusqlite::Error) -> CatalogError {
    CatalogError::at_step(OPERATION, step, deadline, source, |source| {
        CatalogError::WriteFailed {
            operation: OPERATION,
            step,
            source,
        }
    })
}

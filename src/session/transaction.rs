//! Deadline-bound transaction guard.
//!
//! A [`Tx`] holds its session's connection for its whole lifetime. It ends in
//! exactly one of two ways: a successful [`Tx::commit`], or a rollback, issued
//! explicitly through [`Tx::rollback`] or implicitly when the guard is dropped.
//! Rolling back a transaction that already ended is a no-op.

use super::deadline::Deadline;
use super::provider::ExecOutcome;
use rusqlite::{ffi, Connection, OptionalExtension, Params, Row};
use std::sync::MutexGuard;
use std::time::Duration;
use tracing::{debug, warn};

/// Number of SQLite VM instructions between two deadline checks.
const PROGRESS_CHECK_INTERVAL: i32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// `BEGIN` has not succeeded yet.
    Starting,
    Active,
    Committed,
    RolledBack,
}

pub struct Tx<'s> {
    conn: MutexGuard<'s, Connection>,
    state: TxState,
    /// Busy timeout configured on the session, restored when the guard ends.
    session_busy_timeout: Duration,
}

impl<'s> Tx<'s> {
    pub(super) fn begin(
        conn: MutexGuard<'s, Connection>,
        deadline: &Deadline,
        session_busy_timeout: Duration,
    ) -> rusqlite::Result<Self> {
        let mut tx = Tx {
            conn,
            state: TxState::Starting,
            session_busy_timeout,
        };
        // Lock waits may not outlive the deadline.
        tx.conn
            .busy_timeout(deadline.remaining().min(session_busy_timeout))?;
        tx.conn
            .progress_handler(PROGRESS_CHECK_INTERVAL, Some(deadline.interrupt_check()));
        tx.conn.execute_batch("BEGIN IMMEDIATE")?;
        tx.state = TxState::Active;
        debug!("Transaction started");
        Ok(tx)
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    fn ensure_active(&self) -> rusqlite::Result<()> {
        if self.state == TxState::Active {
            Ok(())
        } else {
            Err(rusqlite::Error::SqliteFailure(
                ffi::Error::new(ffi::SQLITE_MISUSE),
                Some(format!("transaction is not active ({:?})", self.state)),
            ))
        }
    }

    /// Runs a statement expected to produce at most one row.
    pub fn query_row_opt<T, P, F>(&self, sql: &str, params: P, f: F) -> rusqlite::Result<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.ensure_active()?;
        let mut stmt = self.conn.prepare_cached(sql)?;
        stmt.query_row(params, f).optional()
    }

    pub fn query<T, P, F>(&self, sql: &str, params: P, f: F) -> rusqlite::Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.ensure_active()?;
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, f)?.collect();
        rows
    }

    pub fn exec<P: Params>(&self, sql: &str, params: P) -> rusqlite::Result<ExecOutcome> {
        self.ensure_active()?;
        let rows_affected = self.conn.execute(sql, params)?;
        Ok(ExecOutcome {
            rows_affected,
            last_insert_id: self.conn.last_insert_rowid(),
        })
    }

    /// Commits the transaction.
    ///
    /// When `COMMIT` fails SQLite may or may not have rolled back already; in
    /// the latter case the transaction stays active and the next
    /// [`Tx::rollback`] (or the drop of the guard) undoes it.
    pub fn commit(&mut self) -> rusqlite::Result<()> {
        self.ensure_active()?;
        match self.conn.execute_batch("COMMIT") {
            Ok(()) => {
                self.state = TxState::Committed;
                self.release_deadline();
                debug!("Transaction committed");
                Ok(())
            }
            Err(e) => {
                if self.conn.is_autocommit() {
                    self.state = TxState::RolledBack;
                    self.release_deadline();
                }
                Err(e)
            }
        }
    }

    /// Rolls the transaction back. Does nothing if it already committed or
    /// rolled back.
    pub fn rollback(&mut self) -> rusqlite::Result<()> {
        if self.state != TxState::Active {
            return Ok(());
        }
        // The deadline may be what got us here, it must not interrupt the rollback too.
        self.release_deadline();
        self.state = TxState::RolledBack;
        if self.conn.is_autocommit() {
            // SQLite already rolled back, e.g. after an interrupted write.
            debug!("Transaction already rolled back by the store");
            return Ok(());
        }
        self.conn.execute_batch("ROLLBACK")?;
        debug!("Transaction rolled back");
        Ok(())
    }

    fn release_deadline(&self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
        if let Err(e) = self.conn.busy_timeout(self.session_busy_timeout) {
            warn!("Failed to restore busy timeout: {}", e);
        }
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        match self.state {
            TxState::Active => {
                if let Err(e) = self.rollback() {
                    warn!("Rollback on drop failed: {}", e);
                }
            }
            TxState::Starting => self.release_deadline(),
            TxState::Committed | TxState::RolledBack => {}
        }
    }
}

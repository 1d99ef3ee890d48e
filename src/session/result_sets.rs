//! Cursor over the result sets produced by a multi-statement query.
//!
//! Outer iteration ([`ResultSets::next_result_set`]) moves from one statement
//! to the next, inner iteration ([`ResultSets::collect_rows`]) drains the rows
//! of the current one. The two levels fail independently: misusing the cursor
//! is a [`ResultSetError::Protocol`] error, a row that cannot be decoded is a
//! [`ResultSetError::RowScan`] error.

use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::{Batch, Row, Statement};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResultSetError {
    #[error("result set {result_set}: {reason}")]
    Protocol {
        result_set: usize,
        reason: &'static str,
    },

    #[error("result set {result_set}, row {row}: {source}")]
    RowScan {
        result_set: usize,
        row: usize,
        #[source]
        source: rusqlite::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

enum Cursor<'conn> {
    BeforeFirst,
    Pending(Statement<'conn>),
    Consumed,
    Exhausted,
}

pub struct ResultSets<'conn, 'sql> {
    batch: Batch<'conn, 'sql>,
    cursor: Cursor<'conn>,
    /// Zero-based index of the current result set, `None` before the first advance.
    index: Option<usize>,
}

impl<'conn, 'sql> ResultSets<'conn, 'sql> {
    pub(super) fn new(batch: Batch<'conn, 'sql>) -> Self {
        Self {
            batch,
            cursor: Cursor::BeforeFirst,
            index: None,
        }
    }

    /// Index of the current result set, if the cursor was advanced at least once.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    fn next_index(&self) -> usize {
        self.index.map_or(0, |i| i + 1)
    }

    /// Advances to the next pending result set. Returns `false` once all of
    /// them have been consumed.
    ///
    /// The current result set must have been drained with
    /// [`ResultSets::collect_rows`] first.
    pub fn next_result_set(&mut self) -> Result<bool, ResultSetError> {
        match self.cursor {
            Cursor::Pending(_) => {
                return Err(ResultSetError::Protocol {
                    result_set: self.index.unwrap_or_default(),
                    reason: "advanced before the current result set was consumed",
                })
            }
            Cursor::Exhausted => return Ok(false),
            Cursor::BeforeFirst | Cursor::Consumed => {}
        }

        match self.batch.next()? {
            Some(stmt) => {
                self.index = Some(self.next_index());
                self.cursor = Cursor::Pending(stmt);
                Ok(true)
            }
            None => {
                self.cursor = Cursor::Exhausted;
                Ok(false)
            }
        }
    }

    /// Drains every row of the current result set through `f`.
    pub fn collect_rows<T, F>(&mut self, mut f: F) -> Result<Vec<T>, ResultSetError>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let result_set = self.index.unwrap_or_default();
        let mut stmt = match std::mem::replace(&mut self.cursor, Cursor::Consumed) {
            Cursor::Pending(stmt) => stmt,
            other => {
                let reason = match other {
                    Cursor::BeforeFirst => "rows requested before advancing to a result set",
                    Cursor::Exhausted => "rows requested after the last result set",
                    _ => "result set already consumed",
                };
                self.cursor = other;
                return Err(ResultSetError::Protocol { result_set, reason });
            }
        };

        let mut items = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let item = f(row).map_err(|source| ResultSetError::RowScan {
                result_set,
                row: items.len(),
                source,
            })?;
            items.push(item);
        }
        Ok(items)
    }
}

//! Classified failures of catalog operations.

use super::validation::ValidationError;
use crate::session::{Deadline, ResultSetError};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Every variant names the operation that failed.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{operation}: {entity} {key} not found")]
    NotFound {
        operation: &'static str,
        entity: &'static str,
        key: String,
    },

    #[error(
        "{operation}: not enough copies of '{title}' (requested {requested}, available {available})"
    )]
    InsufficientStock {
        operation: &'static str,
        title: String,
        requested: u32,
        available: i64,
    },

    #[error("{operation}: {source}")]
    InvalidInput {
        operation: &'static str,
        #[source]
        source: ValidationError,
    },

    #[error("{operation}: failed to begin transaction: {source}")]
    TransactionBeginFailed {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{operation}: {step} failed: {source}")]
    WriteFailed {
        operation: &'static str,
        step: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{operation}: commit failed: {source}")]
    CommitFailed {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{operation}: deadline exceeded during {step}")]
    DeadlineExceeded {
        operation: &'static str,
        step: &'static str,
    },

    #[error("{operation}: result set protocol error at set {result_set}: {reason}")]
    ResultSetProtocolError {
        operation: &'static str,
        result_set: usize,
        reason: &'static str,
    },

    #[error("{operation}: cannot read row {row} of result set {result_set}: {source}")]
    RowScan {
        operation: &'static str,
        result_set: usize,
        row: usize,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{operation}: store error: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl CatalogError {
    pub fn store(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> CatalogError {
        move |source| CatalogError::Store { operation, source }
    }

    pub fn invalid_input(operation: &'static str) -> impl FnOnce(ValidationError) -> CatalogError {
        move |source| CatalogError::InvalidInput { operation, source }
    }

    pub fn from_result_sets(operation: &'static str, err: ResultSetError) -> CatalogError {
        match err {
            ResultSetError::Protocol { result_set, reason } => {
                CatalogError::ResultSetProtocolError {
                    operation,
                    result_set,
                    reason,
                }
            }
            ResultSetError::RowScan {
                result_set,
                row,
                source,
            } => CatalogError::RowScan {
                operation,
                result_set,
                row,
                source,
            },
            ResultSetError::Store(source) => CatalogError::Store { operation, source },
        }
    }

    /// Classifies a failed statement of a deadline-bound step: interruptions
    /// and anything failing past the deadline count as
    /// [`CatalogError::DeadlineExceeded`], the rest goes through `classify`.
    pub fn at_step(
        operation: &'static str,
        step: &'static str,
        deadline: &Deadline,
        source: rusqlite::Error,
        classify: impl FnOnce(rusqlite::Error) -> CatalogError,
    ) -> CatalogError {
        let interrupted = source.sqlite_error_code() == Some(ErrorCode::OperationInterrupted);
        if interrupted || deadline.is_expired() {
            CatalogError::DeadlineExceeded { operation, step }
        } else {
            classify(source)
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

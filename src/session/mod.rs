//! Connections, transactions and result-set cursors over the catalog database.

mod deadline;
mod provider;
mod result_sets;
mod transaction;

pub use deadline::Deadline;
pub use provider::{
    ExecOutcome, Session, SessionConfig, SessionProvider, DEFAULT_BUSY_TIMEOUT,
    MAX_BUSY_TIMEOUT,
};
pub use result_sets::{ResultSetError, ResultSets};
pub use transaction::{Tx, TxState};

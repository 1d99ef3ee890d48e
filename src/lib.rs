//! Recordings catalog library
//!
//! Data access over a SQLite catalog of albums, songs and orders: typed reads,
//! plain inserts, and an all-or-nothing order transaction.

pub mod catalog_store;
pub mod config;
pub mod session;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog_store::{Catalog, CatalogError, CATALOG_SCHEMA};
pub use session::{Deadline, Session, SessionConfig, SessionProvider};

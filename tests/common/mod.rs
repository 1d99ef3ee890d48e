//! Common test infrastructure
//!
//! Each test gets its own database file in a temporary directory, seeded with
//! the fixture catalog from [`fixtures`]. Tests open as many sessions against
//! it as they need.

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::TestCatalog;

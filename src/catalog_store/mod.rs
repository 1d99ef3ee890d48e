mod error;
mod models;
mod orders;
mod reader;
mod schema;
mod seed;
mod validation;
mod writer;

use crate::session::Session;
use std::sync::Arc;

pub use error::CatalogError;
pub use models::*;
pub use orders::OrderEngine;
pub use reader::CatalogReader;
pub use schema::CATALOG_SCHEMA;
pub use seed::seed_demo_catalog;
pub use validation::{ValidationError, ValidationResult};
pub use writer::CatalogWriter;

/// The catalog components, all sharing one session.
#[derive(Clone)]
pub struct Catalog {
    pub reader: CatalogReader,
    pub writer: CatalogWriter,
    pub orders: OrderEngine,
}

impl Catalog {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            reader: CatalogReader::new(session.clone()),
            writer: CatalogWriter::new(session.clone()),
            orders: OrderEngine::new(session),
        }
    }
}

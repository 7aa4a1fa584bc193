//! Storage backends.
//!
//! One `QueryAdapter` implementation per engine. The factory builds the
//! configured backend behind an `Arc<dyn QueryAdapter>` so nothing outside
//! this module touches an engine driver.

use std::sync::Arc;

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::adapter::QueryAdapter;

pub mod document;
pub mod range;
pub mod relational;

pub use document::DocumentBackend;
pub use range::RangeBackend;
pub use relational::RelationalBackend;

/// Which storage engine to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// In-memory document store with native regex matching
    Document,
    /// Embedded ordered key-value store (redb)
    Range,
    /// Relational database (SeaORM)
    Relational,
}

/// Build the selected backend from configuration.
pub async fn build_backend(kind: BackendKind, config: &Config) -> AppResult<Arc<dyn QueryAdapter>> {
    match kind {
        BackendKind::Document => Ok(Arc::new(DocumentBackend::new())),
        BackendKind::Range => {
            let backend = RangeBackend::open(&config.store_path).map_err(AppError::Persistence)?;
            Ok(Arc::new(backend))
        }
        BackendKind::Relational => {
            let db = crate::infra::db::Database::connect(config).await?;
            Ok(Arc::new(RelationalBackend::new(db.get_connection())))
        }
    }
}

//! Entity persistence and search core.
//!
//! A CRUD core for a small catalog domain (users, roles, categories,
//! products) that runs unchanged on three storage engines with very
//! different query capabilities: an in-memory document store, an embedded
//! ordered key-value store, and a relational database. Engine differences
//! stay behind the [`infra::QueryAdapter`] trait; services implement the
//! business rules once.
//!
//! Highlights:
//! - soft deletes everywhere: rows flip `state` to false and stay fetchable
//!   by id while disappearing from lists and search
//! - case-insensitive name uniqueness via a persisted lowercase search key
//! - asset uploads coordinated with entity writes through a compensating
//!   saga, so a failed step never leaves a half-linked record
//! - ownership and role guards evaluated against freshly loaded data
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use storefront_core::infra::{DocumentBackend, QueryAdapter};
//! use storefront_core::services::{CategoryManager, CategoryService};
//! use storefront_core::domain::CreateCategory;
//!
//! # async fn demo() -> storefront_core::errors::AppResult<()> {
//! let store: Arc<dyn QueryAdapter> = Arc::new(DocumentBackend::new());
//! let categories = CategoryManager::new(store);
//!
//! let owner = uuid::Uuid::new_v4();
//! let created = categories
//!     .create(owner, CreateCategory { name: "  home   appliances ".into() })
//!     .await?;
//! assert_eq!(created.name, "Home appliances");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;

pub use config::Config;
pub use errors::{AppError, AppResult};

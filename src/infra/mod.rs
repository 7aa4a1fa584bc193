//! Infrastructure layer - External systems integration
//!
//! Storage backends, the database connection, and the asset store client.
//! Only this layer holds engine drivers; services see the `QueryAdapter` and
//! `AssetStore` traits.

pub mod adapter;
pub mod assets;
pub mod backends;
pub mod db;
pub(crate) mod entities;

pub use adapter::{Document, EntityKind, QueryAdapter, StoreError, StoreResult};
pub use assets::{AssetError, AssetStore, LocalAssetStore, StoredAsset};
pub use backends::{build_backend, BackendKind, DocumentBackend, RangeBackend, RelationalBackend};
pub use db::{Database, Migrator};

#[cfg(any(test, feature = "test-utils"))]
pub use adapter::MockQueryAdapter;
#[cfg(any(test, feature = "test-utils"))]
pub use assets::MockAssetStore;

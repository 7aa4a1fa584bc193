//! Role lookups and startup seeding.
//!
//! The role set is fixed. Seeding is idempotent and runs at startup; after
//! that roles are read-only reference data other services load fresh when
//! they need to authorize an operation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::config::SEEDED_ROLES;
use crate::domain::Role;
use crate::errors::{AppResult, OptionExt};
use crate::infra::adapter::{from_document, Document, EntityKind, QueryAdapter};

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RoleService: Send + Sync {
    /// Ensure every fixed role exists. Safe to call repeatedly.
    async fn seed(&self) -> AppResult<()>;

    /// Load a role by id. Callers re-fetch rather than caching so that a
    /// reassigned role takes effect on the next request.
    async fn get(&self, id: Uuid) -> AppResult<Role>;

    async fn find_by_name(&self, name: &str) -> AppResult<Role>;
}

pub struct RoleManager {
    store: Arc<dyn QueryAdapter>,
}

impl RoleManager {
    pub fn new(store: Arc<dyn QueryAdapter>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RoleService for RoleManager {
    async fn seed(&self) -> AppResult<()> {
        for name in SEEDED_ROLES {
            let mut wanted = Document::new();
            wanted.insert("name".to_string(), Value::String((*name).to_string()));

            if !self.store.exists(EntityKind::Role, wanted, None).await? {
                let mut doc = Document::new();
                doc.insert("name".to_string(), Value::String((*name).to_string()));
                self.store.insert(EntityKind::Role, doc).await?;
                tracing::info!(role = name, "seeded role");
            }
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Role> {
        let doc = self
            .store
            .find_by_id(EntityKind::Role, id)
            .await?
            .ok_or_not_found()?;
        Ok(from_document(doc)?)
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Role> {
        let mut wanted = Document::new();
        wanted.insert("name".to_string(), Value::String(name.to_string()));

        let mut matches = self.store.find_exact(EntityKind::Role, wanted).await?;
        let doc = if matches.is_empty() {
            None
        } else {
            Some(matches.swap_remove(0))
        };
        Ok(from_document(doc.ok_or_not_found()?)?)
    }
}

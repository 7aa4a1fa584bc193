//! Asset link saga.
//!
//! Links a persisted entity to an asset in the external object store. No
//! transaction spans both systems, so every step that leaves external state
//! behind carries a compensating action:
//!
//! 1. persist the entity without an asset reference
//! 2. upload the asset keyed by the entity id (retries overwrite)
//! 3. persist the asset URL on the entity
//!
//! Upload failure rolls back step 1; a write failure after a successful
//! upload rolls back step 2 (and step 1 on the create path). A failure while
//! compensating is reported as `CompensationFailed` carrying both errors —
//! never as success.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::infra::adapter::{doc_id, doc_str, Document, EntityKind, QueryAdapter};
use crate::infra::AssetStore;

/// Saga progress, for logging and post-mortems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaState {
    Created,
    AssetLinked,
    Failed,
}

pub struct AssetLinkSaga {
    store: Arc<dyn QueryAdapter>,
    assets: Arc<dyn AssetStore>,
}

impl AssetLinkSaga {
    pub fn new(store: Arc<dyn QueryAdapter>, assets: Arc<dyn AssetStore>) -> Self {
        Self { store, assets }
    }

    /// Create an entity together with its asset. On any failure the entity
    /// row must not survive.
    pub async fn create_with_asset(
        &self,
        kind: EntityKind,
        doc: Document,
        bytes: Vec<u8>,
        folder: &str,
        link_field: &str,
    ) -> AppResult<Document> {
        // Step 1: persist without the asset reference. Nothing external has
        // happened yet, so a failure here needs no compensation.
        let created = self.store.insert(kind, doc).await?;
        let id = doc_id(&created)
            .ok_or_else(|| AppError::internal("created entity has no id"))?;
        tracing::debug!(collection = %kind, %id, state = ?SagaState::Created, "asset saga");

        // Step 2: upload keyed by the new id.
        let uploaded = match self
            .assets
            .upload(bytes, Some(&id.to_string()), folder)
            .await
        {
            Ok(asset) => asset,
            Err(e) => {
                let primary = AppError::upload(e.to_string());
                return Err(self.unwind_created(kind, id, primary).await);
            }
        };

        // Step 3: link the asset URL.
        let mut patch = Document::new();
        patch.insert(link_field.to_string(), Value::String(uploaded.url.clone()));

        match self.store.update(kind, id, patch).await {
            Ok(linked) => {
                tracing::debug!(collection = %kind, %id, state = ?SagaState::AssetLinked, "asset saga");
                Ok(linked)
            }
            Err(e) => {
                let primary = AppError::Persistence(e);
                let mut compensation_failures = Vec::new();

                if let Err(remove_err) = self.assets.remove(&uploaded.key, folder).await {
                    compensation_failures.push(format!("asset removal: {remove_err}"));
                }
                if let Err(delete_err) = self.store.delete(kind, id).await {
                    compensation_failures.push(format!("entity removal: {delete_err}"));
                }

                Err(self.fail(kind, id, primary, compensation_failures))
            }
        }
    }

    /// Replace (or set) the asset of an existing entity. Upload first using
    /// the existing id as key, persist afterward; the entity itself is never
    /// rolled back on this path.
    pub async fn replace_asset(
        &self,
        kind: EntityKind,
        id: Uuid,
        bytes: Vec<u8>,
        folder: &str,
        link_field: &str,
    ) -> AppResult<Document> {
        let existing = self
            .store
            .find_by_id(kind, id)
            .await?
            .ok_or(AppError::NotFound)?;
        let stale = doc_str(&existing, link_field).map(str::to_string);

        let uploaded = self
            .assets
            .upload(bytes, Some(&id.to_string()), folder)
            .await
            .map_err(|e| AppError::upload(e.to_string()))?;

        let mut patch = Document::new();
        patch.insert(link_field.to_string(), Value::String(uploaded.url.clone()));

        match self.store.update(kind, id, patch).await {
            Ok(linked) => {
                // Best-effort cleanup of a previous asset stored under a
                // different key; never fails the operation.
                if let Some(old) = stale {
                    if !old.ends_with(&uploaded.key) {
                        if let Err(e) = self.assets.remove(&old, folder).await {
                            tracing::warn!(collection = %kind, %id, error = %e, "stale asset cleanup failed");
                        }
                    }
                }
                tracing::debug!(collection = %kind, %id, state = ?SagaState::AssetLinked, "asset saga");
                Ok(linked)
            }
            Err(e) => {
                let primary = AppError::Persistence(e);
                let mut compensation_failures = Vec::new();
                if let Err(remove_err) = self.assets.remove(&uploaded.key, folder).await {
                    compensation_failures.push(format!("asset removal: {remove_err}"));
                }
                Err(self.fail(kind, id, primary, compensation_failures))
            }
        }
    }

    /// Roll back step 1 after an upload failure.
    async fn unwind_created(&self, kind: EntityKind, id: Uuid, primary: AppError) -> AppError {
        match self.store.delete(kind, id).await {
            Ok(()) => self.fail(kind, id, primary, Vec::new()),
            Err(e) => self.fail(kind, id, primary, vec![format!("entity removal: {e}")]),
        }
    }

    /// Terminal failure; attaches compensation outcomes when any rollback
    /// step itself failed.
    fn fail(
        &self,
        kind: EntityKind,
        id: Uuid,
        primary: AppError,
        compensation_failures: Vec<String>,
    ) -> AppError {
        tracing::warn!(collection = %kind, %id, state = ?SagaState::Failed, error = %primary, "asset saga");

        if compensation_failures.is_empty() {
            primary
        } else {
            AppError::CompensationFailed {
                primary: Box::new(primary),
                compensation: compensation_failures.join("; "),
            }
        }
    }
}

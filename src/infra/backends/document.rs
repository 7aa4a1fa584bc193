//! In-memory document backend with native regular-expression matching.
//!
//! Plays the role of the pattern-capable document store: prefix search is an
//! anchored regex on the search key and free-text search an unanchored one.
//! Also the backend of choice for tests and prototyping.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::infra::adapter::{
    doc_state, matches_fields, stamp_new, stamp_updated, Document, EntityKind, QueryAdapter,
    StoreError, StoreResult,
};

/// Collection map guarded by a single async lock; each request sees its own
/// cloned documents, never shared references.
pub struct DocumentBackend {
    data: Arc<RwLock<HashMap<EntityKind, BTreeMap<String, Document>>>>,
}

impl DocumentBackend {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn compile(pattern: String) -> StoreResult<Regex> {
        Regex::new(&pattern).map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl Default for DocumentBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryAdapter for DocumentBackend {
    async fn insert(&self, kind: EntityKind, mut doc: Document) -> StoreResult<Document> {
        stamp_new(&mut doc);
        let id = crate::infra::adapter::doc_id(&doc)
            .ok_or_else(|| StoreError::Backend("inserted document has no id".into()))?;

        let mut data = self.data.write().await;
        data.entry(kind)
            .or_default()
            .insert(id.to_string(), doc.clone());
        Ok(doc)
    }

    async fn find_by_id(&self, kind: EntityKind, id: Uuid) -> StoreResult<Option<Document>> {
        let data = self.data.read().await;
        Ok(data
            .get(&kind)
            .and_then(|coll| coll.get(&id.to_string()))
            .cloned())
    }

    async fn find_exact(&self, kind: EntityKind, fields: Document) -> StoreResult<Vec<Document>> {
        let data = self.data.read().await;
        Ok(data
            .get(&kind)
            .map(|coll| {
                coll.values()
                    .filter(|doc| doc_state(doc) && matches_fields(doc, &fields))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_prefix(
        &self,
        kind: EntityKind,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<Document>> {
        // Starts-with pattern, anchored the way the engine natively supports
        let re = Self::compile(format!("(?i)^{}", regex::escape(value)))?;

        let data = self.data.read().await;
        Ok(data
            .get(&kind)
            .map(|coll| {
                coll.values()
                    .filter(|doc| {
                        doc_state(doc)
                            && doc
                                .get(field)
                                .and_then(Value::as_str)
                                .is_some_and(|s| re.is_match(s))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_text(
        &self,
        kind: EntityKind,
        fields: &'static [&'static str],
        query: &str,
    ) -> StoreResult<Vec<Document>> {
        // Match anywhere in the field, case-insensitively
        let re = Self::compile(format!("(?i){}", regex::escape(query)))?;

        let data = self.data.read().await;
        Ok(data
            .get(&kind)
            .map(|coll| {
                coll.values()
                    .filter(|doc| {
                        doc_state(doc)
                            && fields.iter().any(|field| {
                                doc.get(*field)
                                    .and_then(Value::as_str)
                                    .is_some_and(|s| re.is_match(s))
                            })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn exists(
        &self,
        kind: EntityKind,
        fields: Document,
        exclude_id: Option<Uuid>,
    ) -> StoreResult<bool> {
        let excluded = exclude_id.map(|id| id.to_string());

        let data = self.data.read().await;
        Ok(data.get(&kind).is_some_and(|coll| {
            coll.iter().any(|(id, doc)| {
                excluded.as_deref() != Some(id.as_str())
                    && doc_state(doc)
                    && matches_fields(doc, &fields)
            })
        }))
    }

    async fn update(&self, kind: EntityKind, id: Uuid, patch: Document) -> StoreResult<Document> {
        let mut data = self.data.write().await;
        let doc = data
            .get_mut(&kind)
            .and_then(|coll| coll.get_mut(&id.to_string()))
            .ok_or(StoreError::NotFound)?;

        for (k, v) in patch {
            doc.insert(k, v);
        }
        stamp_updated(doc);
        Ok(doc.clone())
    }

    async fn soft_delete(&self, kind: EntityKind, id: Uuid) -> StoreResult<Document> {
        let mut patch = Document::new();
        patch.insert("state".to_string(), Value::Bool(false));
        self.update(kind, id, patch).await
    }

    async fn delete(&self, kind: EntityKind, id: Uuid) -> StoreResult<()> {
        let mut data = self.data.write().await;
        data.get_mut(&kind)
            .and_then(|coll| coll.remove(&id.to_string()))
            .ok_or(StoreError::NotFound)?;
        Ok(())
    }
}

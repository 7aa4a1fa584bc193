//! Storage engine abstraction.
//!
//! `QueryAdapter` gives three engines with incompatible query capabilities an
//! identical external contract. Records travel as schemaless JSON documents;
//! each backend maps them onto its own representation. Backends are the only
//! components allowed to hold an engine driver.

use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// A stored record in transit between services and a backend.
pub type Document = serde_json::Map<String, Value>;

/// Transport-level storage failure. `NotFound` is only produced by mutating
/// operations whose target row is missing; lookups report absence through
/// their return type.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("backend failure: {0}")]
    Backend(String),

    #[error("serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sea_orm::DbErr> for StoreError {
    fn from(e: sea_orm::DbErr) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<redb::DatabaseError> for StoreError {
    fn from(e: redb::DatabaseError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(e: redb::TableError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(e: redb::StorageError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(e: redb::CommitError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// The entity collections the core persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Role,
    Category,
    Product,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Role => "roles",
            EntityKind::Category => "categories",
            EntityKind::Product => "products",
        }
    }

    /// Resolve a collection selector; unknown selectors are `None`, which the
    /// search facade maps to an empty result rather than an error.
    pub fn from_collection(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "users" => Some(EntityKind::User),
            "roles" => Some(EntityKind::Role),
            "categories" => Some(EntityKind::Category),
            "products" => Some(EntityKind::Product),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform query interface implemented once per storage engine.
///
/// Visibility rules shared by every implementation:
/// - `find_by_id` returns soft-deleted records too (internal lookups need
///   them); everything else filters to `state == true`.
/// - `exists` never fails for "no match", only for transport errors.
/// - `soft_delete` flips `state` to false and keeps the row forever;
///   `delete` physically removes a row and exists for saga compensation only.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait QueryAdapter: Send + Sync {
    /// Persist a new document; assigns id, timestamps and default state.
    async fn insert(&self, kind: EntityKind, doc: Document) -> StoreResult<Document>;

    /// Fetch one record by id, soft-deleted included.
    async fn find_by_id(&self, kind: EntityKind, id: Uuid) -> StoreResult<Option<Document>>;

    /// Equality filter over `fields`, active records only.
    async fn find_exact(&self, kind: EntityKind, fields: Document) -> StoreResult<Vec<Document>>;

    /// Case-insensitive starts-with on one field, active records only.
    async fn find_prefix(
        &self,
        kind: EntityKind,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<Document>>;

    /// Case-insensitive free-text match ORed across `fields`, active records
    /// only. Engines with substring support match anywhere; the range engine
    /// degrades to prefix matching.
    async fn find_text(
        &self,
        kind: EntityKind,
        fields: &'static [&'static str],
        query: &str,
    ) -> StoreResult<Vec<Document>>;

    /// Whether an active record matches `fields`, optionally excluding one id
    /// (duplicate checks on update exclude the record being updated).
    async fn exists(
        &self,
        kind: EntityKind,
        fields: Document,
        exclude_id: Option<Uuid>,
    ) -> StoreResult<bool>;

    /// Patch fields on an existing record; refreshes `updated_at`.
    async fn update(&self, kind: EntityKind, id: Uuid, patch: Document) -> StoreResult<Document>;

    /// Mark a record deleted (`state = false`) and return it. The row is
    /// never physically removed.
    async fn soft_delete(&self, kind: EntityKind, id: Uuid) -> StoreResult<Document>;

    /// Physically remove a row. Only saga compensation may call this.
    async fn delete(&self, kind: EntityKind, id: Uuid) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// Document helpers shared by backends and services
// ---------------------------------------------------------------------------

/// Serialize a domain value into a document.
pub fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Backend(format!(
            "expected object document, got {other}"
        ))),
    }
}

/// Deserialize a document back into a domain value.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Read a string field.
pub fn doc_str<'a>(doc: &'a Document, key: &str) -> Option<&'a str> {
    doc.get(key).and_then(Value::as_str)
}

/// Read the record id.
pub fn doc_id(doc: &Document) -> Option<Uuid> {
    doc_str(doc, "id").and_then(|s| Uuid::parse_str(s).ok())
}

/// Read the soft-delete flag; absent means active.
pub fn doc_state(doc: &Document) -> bool {
    doc.get("state").and_then(Value::as_bool).unwrap_or(true)
}

/// Assign id, timestamps and default state to a fresh document.
pub fn stamp_new(doc: &mut Document) {
    let now = Utc::now().to_rfc3339();
    doc.entry("id".to_string())
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    doc.entry("state".to_string()).or_insert(Value::Bool(true));
    doc.insert("created_at".to_string(), Value::String(now.clone()));
    doc.insert("updated_at".to_string(), Value::String(now));
}

/// Refresh `updated_at` after applying a patch.
pub fn stamp_updated(doc: &mut Document) {
    doc.insert(
        "updated_at".to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
}

/// Equality check used by the scan-based backends. String comparisons on the
/// search-key fields are byte equality; callers lowercase beforehand.
pub fn matches_fields(doc: &Document, fields: &Document) -> bool {
    fields.iter().all(|(k, v)| doc.get(k) == Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stamp_new_fills_defaults_once() {
        let mut doc = Document::new();
        doc.insert("name".into(), json!("Widget"));
        stamp_new(&mut doc);

        assert!(doc_id(&doc).is_some());
        assert!(doc_state(&doc));
        assert!(doc.contains_key("created_at"));

        let id = doc_id(&doc).unwrap();
        stamp_new(&mut doc);
        assert_eq!(doc_id(&doc), Some(id));
    }

    #[test]
    fn unknown_collection_resolves_to_none() {
        assert_eq!(EntityKind::from_collection("Users"), Some(EntityKind::User));
        assert_eq!(EntityKind::from_collection("orders"), None);
    }

    #[test]
    fn matches_fields_is_conjunctive() {
        let mut doc = Document::new();
        doc.insert("lower".into(), json!("electronics"));
        doc.insert("state".into(), json!(true));

        let mut wanted = Document::new();
        wanted.insert("lower".into(), json!("electronics"));
        assert!(matches_fields(&doc, &wanted));

        wanted.insert("state".into(), json!(false));
        assert!(!matches_fields(&doc, &wanted));
    }
}

//! Embedded ordered key-value backend (redb).
//!
//! This engine has no substring operators; a "starts with" query is emulated
//! with a closed-open key range `[q, successor(q))` over a secondary index of
//! lowercased field values. `successor` increments the final code point of
//! the bound, so the range captures exactly the keys sharing the prefix
//! without scanning the collection.
//!
//! Key layout:
//! - records: `{kind}/{id}` -> JSON document bytes
//! - index:   `{kind}/{field}/{lowercased value}/{id}` -> id

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, TableDefinition};
use serde_json::Value;
use uuid::Uuid;

use crate::infra::adapter::{
    doc_state, doc_str, matches_fields, stamp_new, stamp_updated, Document, EntityKind,
    QueryAdapter, StoreError, StoreResult,
};

const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");
const INDEX: TableDefinition<&str, &str> = TableDefinition::new("search_index");

/// Fields given a secondary index per collection; everything else falls back
/// to a filtered collection scan.
fn indexed_fields(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::User => &["lower", "email"],
        EntityKind::Role => &["name"],
        EntityKind::Category => &["lower"],
        EntityKind::Product => &["lower", "description"],
    }
}

/// Smallest string strictly greater than every string starting with `key`:
/// the final code point incremented by one, skipping the surrogate gap.
/// `None` when the final code point is `char::MAX` and no successor exists;
/// callers then fall back to a full-prefix scan.
fn successor(key: &str) -> Option<String> {
    let mut chars: Vec<char> = key.chars().collect();
    let last = chars.pop()?;

    let mut code = last as u32 + 1;
    loop {
        match char::from_u32(code) {
            Some(next) => {
                chars.push(next);
                return Some(chars.into_iter().collect());
            }
            None if code <= char::MAX as u32 => code += 1,
            None => return None,
        }
    }
}

fn record_key(kind: EntityKind, id: &str) -> String {
    format!("{}/{}", kind.as_str(), id)
}

fn index_key(kind: EntityKind, field: &str, value: &str, id: &str) -> String {
    format!("{}/{}/{}/{}", kind.as_str(), field, value.to_lowercase(), id)
}

fn decode(bytes: &[u8]) -> StoreResult<Document> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Range-capable, substring-incapable storage engine.
///
/// redb transactions are synchronous; operations are short single-key reads
/// and bounded range scans, executed inline on the async worker.
pub struct RangeBackend {
    db: Arc<Database>,
}

impl RangeBackend {
    /// Open (or create) the store file and make sure both tables exist, so
    /// later read transactions never race table creation.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(RECORDS)?;
        txn.open_table(INDEX)?;
        txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Insert one index entry per indexed field present on the document.
    fn index_entries(kind: EntityKind, doc: &Document) -> Vec<String> {
        let Some(id) = doc_str(doc, "id") else {
            return Vec::new();
        };

        indexed_fields(kind)
            .iter()
            .filter_map(|field| {
                doc_str(doc, field).map(|value| index_key(kind, field, value, id))
            })
            .collect()
    }

    fn write_record(&self, kind: EntityKind, doc: &Document, old: Option<&Document>) -> StoreResult<()> {
        let id = doc_str(doc, "id")
            .ok_or_else(|| StoreError::Backend("document has no id".into()))?
            .to_string();
        let bytes = serde_json::to_vec(&Value::Object(doc.clone()))?;

        let txn = self.db.begin_write()?;
        {
            let mut records = txn.open_table(RECORDS)?;
            records.insert(record_key(kind, &id).as_str(), bytes.as_slice())?;

            let mut index = txn.open_table(INDEX)?;
            if let Some(old_doc) = old {
                for key in Self::index_entries(kind, old_doc) {
                    index.remove(key.as_str())?;
                }
            }
            for key in Self::index_entries(kind, doc) {
                index.insert(key.as_str(), id.as_str())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn read_record(&self, kind: EntityKind, id: &str) -> StoreResult<Option<Document>> {
        let txn = self.db.begin_read()?;
        let records = txn.open_table(RECORDS)?;
        match records.get(record_key(kind, id).as_str())? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Scan every record of a kind; the filter decides what is kept.
    fn scan(
        &self,
        kind: EntityKind,
        mut keep: impl FnMut(&Document) -> bool,
    ) -> StoreResult<Vec<Document>> {
        let lo = format!("{}/", kind.as_str());
        let hi = successor(&lo).expect("kind prefix has a successor");

        let txn = self.db.begin_read()?;
        let records = txn.open_table(RECORDS)?;

        let mut out = Vec::new();
        for entry in records.range(lo.as_str()..hi.as_str())? {
            let (_, value) = entry?;
            let doc = decode(value.value())?;
            if keep(&doc) {
                out.push(doc);
            }
        }
        Ok(out)
    }

    /// Ids of index entries in `[{kind}/{field}/{needle}, successor)`.
    fn index_range_ids(
        &self,
        kind: EntityKind,
        field: &str,
        needle: &str,
    ) -> StoreResult<Vec<String>> {
        let lo = format!("{}/{}/{}", kind.as_str(), field, needle.to_lowercase());
        let Some(hi) = successor(&lo) else {
            // Final code point cannot be incremented; scan the field's whole
            // index and filter by prefix instead.
            return self.index_prefix_fallback(kind, field, needle);
        };

        let txn = self.db.begin_read()?;
        let index = txn.open_table(INDEX)?;

        let mut ids = Vec::new();
        for entry in index.range(lo.as_str()..hi.as_str())? {
            let (_, id) = entry?;
            ids.push(id.value().to_string());
        }
        Ok(ids)
    }

    fn index_prefix_fallback(
        &self,
        kind: EntityKind,
        field: &str,
        needle: &str,
    ) -> StoreResult<Vec<String>> {
        let lo = format!("{}/{}/", kind.as_str(), field);
        let hi = successor(&lo).expect("field prefix has a successor");
        let wanted = format!("{lo}{}", needle.to_lowercase());

        let txn = self.db.begin_read()?;
        let index = txn.open_table(INDEX)?;

        let mut ids = Vec::new();
        for entry in index.range(lo.as_str()..hi.as_str())? {
            let (key, id) = entry?;
            if key.value().starts_with(wanted.as_str()) {
                ids.push(id.value().to_string());
            }
        }
        Ok(ids)
    }

    /// Load active documents for a list of ids, preserving order.
    fn load_active(&self, kind: EntityKind, ids: &[String]) -> StoreResult<Vec<Document>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.read_record(kind, id)? {
                if doc_state(&doc) {
                    out.push(doc);
                }
            }
        }
        Ok(out)
    }

    fn prefix_query(
        &self,
        kind: EntityKind,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<Document>> {
        if indexed_fields(kind).contains(&field) {
            let ids = self.index_range_ids(kind, field, value)?;
            self.load_active(kind, &ids)
        } else {
            // Unindexed fields take the slow path
            let needle = value.to_lowercase();
            self.scan(kind, |doc| {
                doc_state(doc)
                    && doc_str(doc, field)
                        .is_some_and(|s| s.to_lowercase().starts_with(&needle))
            })
        }
    }
}

#[async_trait]
impl QueryAdapter for RangeBackend {
    async fn insert(&self, kind: EntityKind, mut doc: Document) -> StoreResult<Document> {
        stamp_new(&mut doc);
        self.write_record(kind, &doc, None)?;
        Ok(doc)
    }

    async fn find_by_id(&self, kind: EntityKind, id: Uuid) -> StoreResult<Option<Document>> {
        self.read_record(kind, &id.to_string())
    }

    async fn find_exact(&self, kind: EntityKind, fields: Document) -> StoreResult<Vec<Document>> {
        self.scan(kind, |doc| doc_state(doc) && matches_fields(doc, &fields))
    }

    async fn find_prefix(
        &self,
        kind: EntityKind,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<Document>> {
        self.prefix_query(kind, field, value)
    }

    async fn find_text(
        &self,
        kind: EntityKind,
        fields: &'static [&'static str],
        query: &str,
    ) -> StoreResult<Vec<Document>> {
        // No substring operator on this engine: degrade to prefix matching
        // per field and merge the results.
        let mut out: Vec<Document> = Vec::new();
        for field in fields {
            for doc in self.prefix_query(kind, field, query)? {
                let id = doc_str(&doc, "id").map(str::to_string);
                if !out
                    .iter()
                    .any(|seen| doc_str(seen, "id").map(str::to_string) == id)
                {
                    out.push(doc);
                }
            }
        }
        Ok(out)
    }

    async fn exists(
        &self,
        kind: EntityKind,
        fields: Document,
        exclude_id: Option<Uuid>,
    ) -> StoreResult<bool> {
        let excluded = exclude_id.map(|id| id.to_string());
        let matches = self.scan(kind, |doc| {
            doc_state(doc)
                && matches_fields(doc, &fields)
                && doc_str(doc, "id") != excluded.as_deref()
        })?;
        Ok(!matches.is_empty())
    }

    async fn update(&self, kind: EntityKind, id: Uuid, patch: Document) -> StoreResult<Document> {
        let old = self
            .read_record(kind, &id.to_string())?
            .ok_or(StoreError::NotFound)?;

        let mut doc = old.clone();
        for (k, v) in patch {
            doc.insert(k, v);
        }
        stamp_updated(&mut doc);

        self.write_record(kind, &doc, Some(&old))?;
        Ok(doc)
    }

    async fn soft_delete(&self, kind: EntityKind, id: Uuid) -> StoreResult<Document> {
        let mut patch = Document::new();
        patch.insert("state".to_string(), Value::Bool(false));
        self.update(kind, id, patch).await
    }

    async fn delete(&self, kind: EntityKind, id: Uuid) -> StoreResult<()> {
        let old = self
            .read_record(kind, &id.to_string())?
            .ok_or(StoreError::NotFound)?;

        let txn = self.db.begin_write()?;
        {
            let mut records = txn.open_table(RECORDS)?;
            records.remove(record_key(kind, &id.to_string()).as_str())?;

            let mut index = txn.open_table(INDEX)?;
            for key in Self::index_entries(kind, &old) {
                index.remove(key.as_str())?;
            }
        }
        txn.commit()?;
        Ok(())
    }
}

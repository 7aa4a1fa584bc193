//! One behavioral suite run against every storage engine. The engines differ
//! wildly in query capability; the contract they expose must not.

mod common;

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use storefront_core::infra::adapter::{doc_id, doc_state, doc_str};
use storefront_core::infra::{
    Database, Document, DocumentBackend, EntityKind, QueryAdapter, RangeBackend,
    RelationalBackend, StoreError,
};
use storefront_core::Config;

fn category_doc(name: &str) -> Document {
    let mut doc = Document::new();
    doc.insert("name".to_string(), Value::String(name.to_string()));
    doc.insert("lower".to_string(), Value::String(name.to_lowercase()));
    doc.insert(
        "owner_id".to_string(),
        Value::String(Uuid::new_v4().to_string()),
    );
    doc
}

fn lower_filter(value: &str) -> Document {
    let mut doc = Document::new();
    doc.insert("lower".to_string(), Value::String(value.to_string()));
    doc
}

async fn document_store() -> Arc<dyn QueryAdapter> {
    Arc::new(DocumentBackend::new())
}

async fn range_store(dir: &tempfile::TempDir) -> Arc<dyn QueryAdapter> {
    Arc::new(RangeBackend::open(dir.path().join("contract.redb")).unwrap())
}

async fn relational_store() -> Arc<dyn QueryAdapter> {
    let config = Config::default();
    let db = Database::connect(&config).await.unwrap();
    Arc::new(RelationalBackend::new(db.get_connection()))
}

async fn contract_suite(store: Arc<dyn QueryAdapter>) {
    common::init_tracing();
    let kind = EntityKind::Category;

    // Inserts assign id, timestamps and active state.
    let electronics = store.insert(kind, category_doc("Electronics")).await.unwrap();
    let electronics_id = doc_id(&electronics).unwrap();
    assert!(doc_state(&electronics));
    assert!(electronics.contains_key("created_at"));
    assert!(electronics.contains_key("updated_at"));

    let guitars = store
        .insert(kind, category_doc("Electric guitars"))
        .await
        .unwrap();
    let guitars_id = doc_id(&guitars).unwrap();

    // Lookup by id round-trips.
    let found = store.find_by_id(kind, electronics_id).await.unwrap().unwrap();
    assert_eq!(doc_str(&found, "name"), Some("Electronics"));
    assert!(store
        .find_by_id(kind, Uuid::new_v4())
        .await
        .unwrap()
        .is_none());

    // Prefix search is case-insensitive and matches a shared prefix.
    let hits = store.find_prefix(kind, "lower", "ELEC").await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(store
        .find_prefix(kind, "lower", "zzz")
        .await
        .unwrap()
        .is_empty());

    // Free text matches at least at prefix position on every engine.
    let hits = store.find_text(kind, &["lower"], "electric").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(doc_id(&hits[0]), Some(guitars_id));

    // Existence checks honor the exclusion id.
    assert!(store
        .exists(kind, lower_filter("electronics"), None)
        .await
        .unwrap());
    assert!(!store
        .exists(kind, lower_filter("electronics"), Some(electronics_id))
        .await
        .unwrap());
    assert!(!store
        .exists(kind, lower_filter("unknown"), None)
        .await
        .unwrap());

    // Updates patch the named fields only.
    let mut patch = Document::new();
    patch.insert("name".to_string(), Value::String("Gadgets".to_string()));
    patch.insert("lower".to_string(), Value::String("gadgets".to_string()));
    let updated = store.update(kind, electronics_id, patch).await.unwrap();
    assert_eq!(doc_str(&updated, "name"), Some("Gadgets"));
    assert_eq!(doc_str(&updated, "owner_id"), doc_str(&electronics, "owner_id"));

    // Soft-deleted rows vanish from queries but stay fetchable by id.
    let deleted = store.soft_delete(kind, electronics_id).await.unwrap();
    assert!(!doc_state(&deleted));
    assert!(store
        .find_prefix(kind, "lower", "gad")
        .await
        .unwrap()
        .is_empty());
    assert!(!store
        .exists(kind, lower_filter("gadgets"), None)
        .await
        .unwrap());
    let still_there = store.find_by_id(kind, electronics_id).await.unwrap().unwrap();
    assert!(!doc_state(&still_there));

    // Physical removal, then the row is gone entirely.
    store.delete(kind, guitars_id).await.unwrap();
    assert!(store.find_by_id(kind, guitars_id).await.unwrap().is_none());
    assert!(matches!(
        store.delete(kind, guitars_id).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn document_engine_honors_the_contract() {
    contract_suite(document_store().await).await;
}

#[tokio::test]
async fn range_engine_honors_the_contract() {
    let dir = tempfile::tempdir().unwrap();
    contract_suite(range_store(&dir).await).await;
}

#[tokio::test]
async fn relational_engine_honors_the_contract() {
    contract_suite(relational_store().await).await;
}

// Substring matching is only promised by the engines that can express it;
// the range engine degrades to prefix matching.
#[tokio::test]
async fn substring_text_search_on_capable_engines() {
    for store in [document_store().await, relational_store().await] {
        common::init_tracing();
        store
            .insert(EntityKind::Category, category_doc("Home appliances"))
            .await
            .unwrap();

        let hits = store
            .find_text(EntityKind::Category, &["lower"], "appli")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }
}

#[tokio::test]
async fn range_engine_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reopen.redb");

    let id = {
        let store = RangeBackend::open(&path).unwrap();
        let created = store
            .insert(EntityKind::Category, category_doc("Electronics"))
            .await
            .unwrap();
        doc_id(&created).unwrap()
    };

    let store = RangeBackend::open(&path).unwrap();
    let found = store
        .find_by_id(EntityKind::Category, id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc_str(&found, "name"), Some("Electronics"));
}

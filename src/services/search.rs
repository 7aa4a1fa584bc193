//! Cross-collection search facade.
//!
//! One entry point fans a query out over the searchable collections. A term
//! that parses as an id becomes an exact lookup; anything else is a free-text
//! match over the collection's searchable fields. Results stay as documents
//! since the caller picks the collection dynamically.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::SEARCHABLE_COLLECTIONS;
use crate::errors::AppResult;
use crate::infra::adapter::{doc_state, Document, EntityKind, QueryAdapter};

/// Free-text fields per collection. `lower` mirrors `name` in lowercase and
/// is what the index-backed engine can actually serve.
fn text_fields(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::User => &["lower", "email"],
        EntityKind::Category => &["lower"],
        EntityKind::Product => &["lower", "description"],
        EntityKind::Role => &[],
    }
}

pub struct SearchFacade {
    store: Arc<dyn QueryAdapter>,
}

impl SearchFacade {
    pub fn new(store: Arc<dyn QueryAdapter>) -> Self {
        Self { store }
    }

    /// Search `collection` for `term`. Unknown or unsearchable collections
    /// yield an empty result rather than an error.
    pub async fn search(&self, collection: &str, term: &str) -> AppResult<Vec<Document>> {
        let Some(kind) = EntityKind::from_collection(collection) else {
            return Ok(Vec::new());
        };
        if !SEARCHABLE_COLLECTIONS.contains(&kind.as_str()) {
            return Ok(Vec::new());
        }

        if let Ok(id) = Uuid::parse_str(term.trim()) {
            let hit = self.store.find_by_id(kind, id).await?;
            return Ok(hit.into_iter().filter(doc_state).collect());
        }

        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.find_text(kind, text_fields(kind), &term).await?)
    }
}

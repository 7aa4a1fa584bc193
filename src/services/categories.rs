//! Category management.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::domain::{normalize, Category, CreateCategory, NameStyle, Product, UpdateCategory};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::adapter::{
    doc_id, doc_state, doc_str, from_document, Document, EntityKind, QueryAdapter,
};

use super::guards::{owner_guard, run_guards};

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CategoryService: Send + Sync {
    /// Create a category owned by `owner_id`. Names are unique among active
    /// categories, compared by search key.
    async fn create(&self, owner_id: Uuid, input: CreateCategory) -> AppResult<Category>;

    /// Fetch by id, soft-deleted included.
    async fn get(&self, id: Uuid) -> AppResult<Category>;

    /// List active categories.
    async fn list(&self) -> AppResult<Vec<Category>>;

    /// Case-insensitive starts-with search over category names.
    async fn search(&self, prefix: &str) -> AppResult<Vec<Category>>;

    /// Rename a category. Only the owner may change it.
    async fn update(
        &self,
        requester_id: Uuid,
        id: Uuid,
        input: UpdateCategory,
    ) -> AppResult<Category>;

    /// Soft-delete a category. Only the owner may remove it.
    async fn delete(&self, requester_id: Uuid, id: Uuid) -> AppResult<Category>;

    /// Active products referencing this category. The category itself must
    /// exist and be active; otherwise `NotFound`.
    async fn products_of(&self, id: Uuid) -> AppResult<Vec<Product>>;
}

pub struct CategoryManager {
    store: Arc<dyn QueryAdapter>,
}

impl CategoryManager {
    pub fn new(store: Arc<dyn QueryAdapter>) -> Self {
        Self { store }
    }

    async fn ensure_name_free(&self, search_key: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let mut wanted = Document::new();
        wanted.insert("lower".to_string(), Value::String(search_key.to_string()));

        if self
            .store
            .exists(EntityKind::Category, wanted, exclude)
            .await?
        {
            return Err(AppError::duplicate(search_key));
        }
        Ok(())
    }

    async fn load_owned(&self, requester_id: Uuid, id: Uuid) -> AppResult<Document> {
        let doc = self
            .store
            .find_by_id(EntityKind::Category, id)
            .await?
            .ok_or_not_found()?;

        let owner = doc_str(&doc, "owner_id")
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| AppError::internal("category has no owner"))?;
        run_guards([owner_guard(requester_id, owner)])?;
        Ok(doc)
    }
}

#[async_trait]
impl CategoryService for CategoryManager {
    async fn create(&self, owner_id: Uuid, input: CreateCategory) -> AppResult<Category> {
        let name = normalize(&input.name, NameStyle::Sentence);
        if name.display.is_empty() {
            return Err(AppError::validation("name must not be blank"));
        }
        self.ensure_name_free(&name.search_key, None).await?;

        let mut doc = Document::new();
        doc.insert("name".to_string(), Value::String(name.display));
        doc.insert("lower".to_string(), Value::String(name.search_key));
        doc.insert("owner_id".to_string(), Value::String(owner_id.to_string()));

        let created = self.store.insert(EntityKind::Category, doc).await?;
        let category: Category = from_document(created)?;
        tracing::info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    async fn get(&self, id: Uuid) -> AppResult<Category> {
        let doc = self
            .store
            .find_by_id(EntityKind::Category, id)
            .await?
            .ok_or_not_found()?;
        Ok(from_document(doc)?)
    }

    async fn list(&self) -> AppResult<Vec<Category>> {
        let docs = self
            .store
            .find_exact(EntityKind::Category, Document::new())
            .await?;
        docs.into_iter()
            .map(|doc| Ok(from_document(doc)?))
            .collect()
    }

    async fn search(&self, prefix: &str) -> AppResult<Vec<Category>> {
        let docs = self
            .store
            .find_prefix(EntityKind::Category, "lower", &prefix.to_lowercase())
            .await?;
        docs.into_iter()
            .map(|doc| Ok(from_document(doc)?))
            .collect()
    }

    async fn update(
        &self,
        requester_id: Uuid,
        id: Uuid,
        input: UpdateCategory,
    ) -> AppResult<Category> {
        let existing = self.load_owned(requester_id, id).await?;

        let mut patch = Document::new();
        if let Some(raw) = input.name {
            let name = normalize(&raw, NameStyle::Sentence);
            if name.display.is_empty() {
                return Err(AppError::validation("name must not be blank"));
            }
            // Renaming back to the current name is not a conflict.
            self.ensure_name_free(&name.search_key, doc_id(&existing))
                .await?;
            patch.insert("name".to_string(), Value::String(name.display));
            patch.insert("lower".to_string(), Value::String(name.search_key));
        }

        let updated = self.store.update(EntityKind::Category, id, patch).await?;
        Ok(from_document(updated)?)
    }

    async fn delete(&self, requester_id: Uuid, id: Uuid) -> AppResult<Category> {
        self.load_owned(requester_id, id).await?;

        let deleted = self.store.soft_delete(EntityKind::Category, id).await?;
        let category: Category = from_document(deleted)?;
        tracing::info!(category_id = %category.id, "category soft-deleted");
        Ok(category)
    }

    async fn products_of(&self, id: Uuid) -> AppResult<Vec<Product>> {
        // Children are only visible through an active parent.
        let parent = self
            .store
            .find_by_id(EntityKind::Category, id)
            .await?
            .ok_or_not_found()?;
        if !doc_state(&parent) {
            return Err(AppError::NotFound);
        }

        let mut wanted = Document::new();
        wanted.insert("category_id".to_string(), Value::String(id.to_string()));

        let docs = self.store.find_exact(EntityKind::Product, wanted).await?;
        docs.into_iter()
            .map(|doc| Ok(from_document(doc)?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::backends::DocumentBackend;

    fn manager() -> (CategoryManager, Uuid) {
        let store: Arc<dyn QueryAdapter> = Arc::new(DocumentBackend::new());
        (CategoryManager::new(store), Uuid::new_v4())
    }

    fn named(name: &str) -> CreateCategory {
        CreateCategory {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn create_sentence_cases_and_collapses_whitespace() {
        let (categories, owner) = manager();
        let category = categories
            .create(owner, named("  home   appliances "))
            .await
            .unwrap();
        assert_eq!(category.name, "Home appliances");
        assert_eq!(category.lower, "home appliances");
    }

    #[tokio::test]
    async fn duplicate_names_differ_only_by_case() {
        let (categories, owner) = manager();
        categories.create(owner, named("Electronics")).await.unwrap();

        let err = categories
            .create(owner, named("ELECTRONICS"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_NAME");
    }

    #[tokio::test]
    async fn rename_to_own_name_is_not_a_conflict() {
        let (categories, owner) = manager();
        let category = categories.create(owner, named("Electronics")).await.unwrap();

        let updated = categories
            .update(
                owner,
                category.id,
                UpdateCategory {
                    name: Some("electronics".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Electronics");
    }

    #[tokio::test]
    async fn non_owner_cannot_update_or_delete() {
        let (categories, owner) = manager();
        let category = categories.create(owner, named("Electronics")).await.unwrap();
        let stranger = Uuid::new_v4();

        let err = categories
            .update(
                stranger,
                category.id,
                UpdateCategory {
                    name: Some("Gadgets".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED_OWNERSHIP");

        let err = categories.delete(stranger, category.id).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED_OWNERSHIP");
    }

    #[tokio::test]
    async fn deleted_category_hides_its_products() {
        let store: Arc<dyn QueryAdapter> = Arc::new(DocumentBackend::new());
        let categories = CategoryManager::new(Arc::clone(&store));
        let owner = Uuid::new_v4();
        let category = categories.create(owner, named("Electronics")).await.unwrap();

        let mut product = Document::new();
        product.insert("name".into(), Value::String("Cable".into()));
        product.insert("lower".into(), Value::String("cable".into()));
        product.insert("price".into(), Value::from(1.0));
        product.insert("description".into(), Value::String("No description".into()));
        product.insert("available".into(), Value::Bool(true));
        product.insert("owner_id".into(), Value::String(owner.to_string()));
        product.insert(
            "category_id".into(),
            Value::String(category.id.to_string()),
        );
        store.insert(EntityKind::Product, product).await.unwrap();

        assert_eq!(categories.products_of(category.id).await.unwrap().len(), 1);

        categories.delete(owner, category.id).await.unwrap();
        let err = categories.products_of(category.id).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        let err = categories.products_of(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn deleted_categories_leave_search_but_not_lookup() {
        let (categories, owner) = manager();
        let category = categories.create(owner, named("Electronics")).await.unwrap();

        categories.delete(owner, category.id).await.unwrap();

        assert!(categories.search("elec").await.unwrap().is_empty());
        let fetched = categories.get(category.id).await.unwrap();
        assert!(!fetched.is_active());

        // The name is free again for a new active category.
        categories.create(owner, named("Electronics")).await.unwrap();
    }
}

//! Product management, including image handling through the asset saga.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::config::{DEFAULT_PRODUCT_DESCRIPTION, FOLDER_PRODUCTS};
use crate::domain::{normalize, CreateProduct, NameStyle, Product, UpdateProduct};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::adapter::{
    doc_id, doc_state, doc_str, from_document, Document, EntityKind, QueryAdapter,
};
use crate::infra::AssetStore;

use super::guards::{owner_guard, run_guards};
use super::saga::AssetLinkSaga;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductService: Send + Sync {
    /// Create a product owned by `owner_id`, optionally with an image. The
    /// referenced category must be active at write time.
    async fn create(
        &self,
        owner_id: Uuid,
        input: CreateProduct,
        image: Option<Vec<u8>>,
    ) -> AppResult<Product>;

    /// Fetch by id, soft-deleted included.
    async fn get(&self, id: Uuid) -> AppResult<Product>;

    /// List active products.
    async fn list(&self) -> AppResult<Vec<Product>>;

    /// Case-insensitive starts-with search over product names.
    async fn search(&self, prefix: &str) -> AppResult<Vec<Product>>;

    /// Update a product. Only the owner may change it.
    async fn update(
        &self,
        requester_id: Uuid,
        id: Uuid,
        input: UpdateProduct,
        image: Option<Vec<u8>>,
    ) -> AppResult<Product>;

    /// Soft-delete a product. Only the owner may remove it.
    async fn delete(&self, requester_id: Uuid, id: Uuid) -> AppResult<Product>;
}

pub struct ProductManager {
    store: Arc<dyn QueryAdapter>,
    saga: AssetLinkSaga,
}

impl ProductManager {
    pub fn new(store: Arc<dyn QueryAdapter>, assets: Arc<dyn AssetStore>) -> Self {
        let saga = AssetLinkSaga::new(Arc::clone(&store), assets);
        Self { store, saga }
    }

    fn ensure_price(price: f64) -> AppResult<()> {
        if price.is_finite() && price >= 0.0 {
            Ok(())
        } else {
            Err(AppError::validation("price must be a non-negative number"))
        }
    }

    /// The category must exist and be active; deleting a category does not
    /// cascade, so the check happens on every write that names one.
    async fn ensure_category_active(&self, category_id: Uuid) -> AppResult<()> {
        let doc = self
            .store
            .find_by_id(EntityKind::Category, category_id)
            .await?;
        match doc {
            Some(doc) if doc_state(&doc) => Ok(()),
            _ => Err(AppError::validation(format!(
                "category '{category_id}' does not exist or is deleted"
            ))),
        }
    }

    async fn ensure_name_free(&self, search_key: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let mut wanted = Document::new();
        wanted.insert("lower".to_string(), Value::String(search_key.to_string()));

        if self
            .store
            .exists(EntityKind::Product, wanted, exclude)
            .await?
        {
            return Err(AppError::duplicate(search_key));
        }
        Ok(())
    }

    async fn load_owned(&self, requester_id: Uuid, id: Uuid) -> AppResult<Document> {
        let doc = self
            .store
            .find_by_id(EntityKind::Product, id)
            .await?
            .ok_or_not_found()?;

        let owner = doc_str(&doc, "owner_id")
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| AppError::internal("product has no owner"))?;
        run_guards([owner_guard(requester_id, owner)])?;
        Ok(doc)
    }
}

#[async_trait]
impl ProductService for ProductManager {
    async fn create(
        &self,
        owner_id: Uuid,
        input: CreateProduct,
        image: Option<Vec<u8>>,
    ) -> AppResult<Product> {
        let name = normalize(&input.name, NameStyle::Sentence);
        if name.display.is_empty() {
            return Err(AppError::validation("name must not be blank"));
        }
        Self::ensure_price(input.price)?;
        self.ensure_category_active(input.category_id).await?;
        self.ensure_name_free(&name.search_key, None).await?;

        let description = input
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PRODUCT_DESCRIPTION.to_string());

        let mut doc = Document::new();
        doc.insert("name".to_string(), Value::String(name.display));
        doc.insert("lower".to_string(), Value::String(name.search_key));
        doc.insert("price".to_string(), Value::from(input.price));
        doc.insert("description".to_string(), Value::String(description));
        doc.insert("available".to_string(), Value::Bool(input.available));
        doc.insert("owner_id".to_string(), Value::String(owner_id.to_string()));
        doc.insert(
            "category_id".to_string(),
            Value::String(input.category_id.to_string()),
        );

        let created = match image {
            Some(bytes) => {
                self.saga
                    .create_with_asset(EntityKind::Product, doc, bytes, FOLDER_PRODUCTS, "img")
                    .await?
            }
            None => self.store.insert(EntityKind::Product, doc).await?,
        };

        let product: Product = from_document(created)?;
        tracing::info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    async fn get(&self, id: Uuid) -> AppResult<Product> {
        let doc = self
            .store
            .find_by_id(EntityKind::Product, id)
            .await?
            .ok_or_not_found()?;
        Ok(from_document(doc)?)
    }

    async fn list(&self) -> AppResult<Vec<Product>> {
        let docs = self
            .store
            .find_exact(EntityKind::Product, Document::new())
            .await?;
        docs.into_iter()
            .map(|doc| Ok(from_document(doc)?))
            .collect()
    }

    async fn search(&self, prefix: &str) -> AppResult<Vec<Product>> {
        let docs = self
            .store
            .find_prefix(EntityKind::Product, "lower", &prefix.to_lowercase())
            .await?;
        docs.into_iter()
            .map(|doc| Ok(from_document(doc)?))
            .collect()
    }

    async fn update(
        &self,
        requester_id: Uuid,
        id: Uuid,
        input: UpdateProduct,
        image: Option<Vec<u8>>,
    ) -> AppResult<Product> {
        let existing = self.load_owned(requester_id, id).await?;

        let mut patch = Document::new();

        if let Some(raw) = input.name {
            let name = normalize(&raw, NameStyle::Sentence);
            if name.display.is_empty() {
                return Err(AppError::validation("name must not be blank"));
            }
            self.ensure_name_free(&name.search_key, doc_id(&existing))
                .await?;
            patch.insert("name".to_string(), Value::String(name.display));
            patch.insert("lower".to_string(), Value::String(name.search_key));
        }
        if let Some(price) = input.price {
            Self::ensure_price(price)?;
            patch.insert("price".to_string(), Value::from(price));
        }
        if let Some(description) = input.description {
            patch.insert("description".to_string(), Value::String(description));
        }
        if let Some(category_id) = input.category_id {
            self.ensure_category_active(category_id).await?;
            patch.insert(
                "category_id".to_string(),
                Value::String(category_id.to_string()),
            );
        }
        if let Some(available) = input.available {
            patch.insert("available".to_string(), Value::Bool(available));
        }

        let updated = if !patch.is_empty() {
            self.store.update(EntityKind::Product, id, patch).await?
        } else {
            existing
        };

        let linked = match image {
            Some(bytes) => {
                self.saga
                    .replace_asset(EntityKind::Product, id, bytes, FOLDER_PRODUCTS, "img")
                    .await?
            }
            None => updated,
        };

        Ok(from_document(linked)?)
    }

    async fn delete(&self, requester_id: Uuid, id: Uuid) -> AppResult<Product> {
        self.load_owned(requester_id, id).await?;

        let deleted = self.store.soft_delete(EntityKind::Product, id).await?;
        let product: Product = from_document(deleted)?;
        tracing::info!(product_id = %product.id, "product soft-deleted");
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CreateCategory;
    use crate::infra::backends::DocumentBackend;
    use crate::infra::MockAssetStore;
    use crate::services::categories::{CategoryManager, CategoryService};

    async fn setup() -> (ProductManager, Uuid, Uuid) {
        let store: Arc<dyn QueryAdapter> = Arc::new(DocumentBackend::new());
        let owner = Uuid::new_v4();

        let categories = CategoryManager::new(Arc::clone(&store));
        let category = categories
            .create(
                owner,
                CreateCategory {
                    name: "Electronics".to_string(),
                },
            )
            .await
            .unwrap();

        let assets = Arc::new(MockAssetStore::new());
        let products = ProductManager::new(store, assets);
        (products, owner, category.id)
    }

    fn input(name: &str, price: f64, category_id: Uuid) -> CreateProduct {
        CreateProduct {
            name: name.to_string(),
            price,
            description: None,
            category_id,
            available: true,
        }
    }

    #[tokio::test]
    async fn create_defaults_description_and_sentence_cases() {
        let (products, owner, category_id) = setup().await;

        let product = products
            .create(owner, input("USB   cable", 9.5, category_id), None)
            .await
            .unwrap();

        assert_eq!(product.name, "Usb cable");
        assert_eq!(product.description, DEFAULT_PRODUCT_DESCRIPTION);
        assert_eq!(product.price, 9.5);
        assert!(product.img.is_none());
    }

    #[tokio::test]
    async fn negative_price_is_rejected() {
        let (products, owner, category_id) = setup().await;

        let err = products
            .create(owner, input("Cable", -1.0, category_id), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_REJECTED");
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let (products, owner, _) = setup().await;

        let err = products
            .create(owner, input("Cable", 1.0, Uuid::new_v4()), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_REJECTED");
    }

    #[tokio::test]
    async fn duplicate_product_names_are_rejected() {
        let (products, owner, category_id) = setup().await;

        products
            .create(owner, input("Cable", 1.0, category_id), None)
            .await
            .unwrap();
        let err = products
            .create(owner, input("CABLE", 2.0, category_id), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_NAME");
    }

    #[tokio::test]
    async fn only_the_owner_may_delete() {
        let (products, owner, category_id) = setup().await;
        let product = products
            .create(owner, input("Cable", 1.0, category_id), None)
            .await
            .unwrap();

        let err = products
            .delete(Uuid::new_v4(), product.id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED_OWNERSHIP");

        let deleted = products.delete(owner, product.id).await.unwrap();
        assert!(!deleted.state);
        assert!(products.search("cab").await.unwrap().is_empty());
    }
}

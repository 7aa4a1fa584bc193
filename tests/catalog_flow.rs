//! End-to-end catalog scenario driven through the service layer, repeated on
//! every storage engine.

mod common;

use std::sync::Arc;

use uuid::Uuid;

use storefront_core::config::{ROLE_ADMIN, ROLE_USER};
use storefront_core::domain::{CreateCategory, CreateProduct, CreateUser, UpdateCategory};
use storefront_core::infra::adapter::doc_str;
use storefront_core::infra::{
    Database, DocumentBackend, MockAssetStore, QueryAdapter, RangeBackend, RelationalBackend,
};
use storefront_core::services::{
    CategoryManager, CategoryService, ProductManager, ProductService, RoleManager, RoleService,
    SearchFacade, UserManager, UserService,
};
use storefront_core::Config;

struct Catalog {
    users: UserManager,
    categories: CategoryManager,
    products: ProductManager,
    search: SearchFacade,
    roles: Arc<RoleManager>,
}

async fn catalog(store: Arc<dyn QueryAdapter>) -> Catalog {
    common::init_tracing();

    let roles = Arc::new(RoleManager::new(Arc::clone(&store)));
    roles.seed().await.unwrap();

    Catalog {
        users: UserManager::new(
            Arc::clone(&store),
            roles.clone(),
            Arc::new(MockAssetStore::new()),
        ),
        categories: CategoryManager::new(Arc::clone(&store)),
        products: ProductManager::new(Arc::clone(&store), Arc::new(MockAssetStore::new())),
        search: SearchFacade::new(Arc::clone(&store)),
        roles,
    }
}

async fn register(catalog: &Catalog, name: &str, email: &str, role: &str) -> Uuid {
    let role = catalog.roles.find_by_name(role).await.unwrap();
    catalog
        .users
        .create(CreateUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role_id: role.id,
            google: false,
        })
        .await
        .unwrap()
        .id
}

async fn scenario(store: Arc<dyn QueryAdapter>) {
    let catalog = catalog(store).await;

    let alice = register(&catalog, "alice", "alice@example.com", ROLE_USER).await;
    let bob = register(&catalog, "bob", "bob@example.com", ROLE_ADMIN).await;

    // Raw input is collapsed and sentence-cased before persisting.
    let category = catalog
        .categories
        .create(
            alice,
            CreateCategory {
                name: "  home   appliances ".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(category.name, "Home appliances");

    // A privileged role does not override ownership.
    let err = catalog
        .categories
        .update(
            bob,
            category.id,
            UpdateCategory {
                name: Some("Bob's stuff".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "UNAUTHORIZED_OWNERSHIP");

    // Names are unique regardless of casing.
    let err = catalog
        .categories
        .create(
            bob,
            CreateCategory {
                name: "HOME appliances".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_NAME");

    // Products attach to the category while it is active.
    let toaster = catalog
        .products
        .create(
            alice,
            CreateProduct {
                name: "Toaster".to_string(),
                price: 25.0,
                description: None,
                category_id: category.id,
                available: true,
            },
            None,
        )
        .await
        .unwrap();

    let in_category = catalog.categories.products_of(category.id).await.unwrap();
    assert_eq!(in_category.len(), 1);
    assert_eq!(in_category[0].id, toaster.id);

    // Search sees the active category by prefix and by id.
    let hits = catalog.search.search("categories", "home").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(doc_str(&hits[0], "name"), Some("Home appliances"));
    let by_id = catalog
        .search
        .search("categories", &category.id.to_string())
        .await
        .unwrap();
    assert_eq!(by_id.len(), 1);

    // Soft-deleting hides the category from search and blocks new products,
    // but the record itself stays fetchable with its flag down.
    catalog.categories.delete(alice, category.id).await.unwrap();

    assert!(catalog
        .search
        .search("categories", "home")
        .await
        .unwrap()
        .is_empty());
    assert!(catalog
        .search
        .search("categories", &category.id.to_string())
        .await
        .unwrap()
        .is_empty());

    let gone = catalog.categories.get(category.id).await.unwrap();
    assert!(!gone.is_active());

    let err = catalog
        .products
        .create(
            alice,
            CreateProduct {
                name: "Kettle".to_string(),
                price: 30.0,
                description: None,
                category_id: category.id,
                available: true,
            },
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_REJECTED");

    // Destructive operations on users need a privileged role; bob has one.
    let bob_user = catalog.users.get(bob).await.unwrap();
    let deleted = catalog.users.soft_delete(bob_user.role_id, alice).await.unwrap();
    assert!(!deleted.state);
}

#[tokio::test]
async fn catalog_flow_on_the_document_engine() {
    scenario(Arc::new(DocumentBackend::new())).await;
}

#[tokio::test]
async fn catalog_flow_on_the_range_engine() {
    let dir = tempfile::tempdir().unwrap();
    let store = RangeBackend::open(dir.path().join("catalog.redb")).unwrap();
    scenario(Arc::new(store)).await;
}

#[tokio::test]
async fn catalog_flow_on_the_relational_engine() {
    let db = Database::connect(&Config::default()).await.unwrap();
    scenario(Arc::new(RelationalBackend::new(db.get_connection()))).await;
}

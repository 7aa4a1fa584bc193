//! User account management.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::config::{DESTRUCTIVE_ROLES, FOLDER_USERS};
use crate::domain::{normalize, CreateUser, NameStyle, UpdateUser, User};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::adapter::{from_document, Document, EntityKind, QueryAdapter};
use crate::infra::AssetStore;

use super::guards::{owner_guard, role_guard, run_guards};
use super::roles::RoleService;
use super::saga::AssetLinkSaga;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserService: Send + Sync {
    /// Register a user. The email must be unused and the role must exist.
    async fn create(&self, input: CreateUser) -> AppResult<User>;

    /// Fetch by id, soft-deleted accounts included.
    async fn get(&self, id: Uuid) -> AppResult<User>;

    /// List active accounts.
    async fn list(&self) -> AppResult<Vec<User>>;

    /// Update an account. Only the account holder may change it.
    async fn update(&self, requester_id: Uuid, id: Uuid, input: UpdateUser) -> AppResult<User>;

    /// Soft-delete an account. Gated on the requester's role, looked up
    /// fresh by `requester_role_id`.
    async fn soft_delete(&self, requester_role_id: Uuid, id: Uuid) -> AppResult<User>;

    /// Upload and link an avatar image, replacing any previous one.
    async fn set_avatar(&self, id: Uuid, bytes: Vec<u8>) -> AppResult<User>;
}

pub struct UserManager {
    store: Arc<dyn QueryAdapter>,
    roles: Arc<dyn RoleService>,
    saga: AssetLinkSaga,
}

impl UserManager {
    pub fn new(
        store: Arc<dyn QueryAdapter>,
        roles: Arc<dyn RoleService>,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        let saga = AssetLinkSaga::new(Arc::clone(&store), assets);
        Self { store, roles, saga }
    }

    async fn ensure_email_free(&self, email: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let mut wanted = Document::new();
        wanted.insert("email".to_string(), Value::String(email.to_string()));

        if self.store.exists(EntityKind::User, wanted, exclude).await? {
            return Err(AppError::duplicate(email));
        }
        Ok(())
    }

    async fn ensure_role_exists(&self, role_id: Uuid) -> AppResult<()> {
        match self.roles.get(role_id).await {
            Ok(_) => Ok(()),
            Err(AppError::NotFound) => Err(AppError::validation(format!(
                "role '{role_id}' does not exist"
            ))),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn create(&self, input: CreateUser) -> AppResult<User> {
        let name = normalize(&input.name, NameStyle::Title);
        if name.display.is_empty() {
            return Err(AppError::validation("name must not be blank"));
        }

        self.ensure_email_free(&input.email, None).await?;
        self.ensure_role_exists(input.role_id).await?;

        let mut doc = Document::new();
        doc.insert("name".to_string(), Value::String(name.display));
        doc.insert("lower".to_string(), Value::String(name.search_key));
        doc.insert("email".to_string(), Value::String(input.email));
        doc.insert(
            "password_hash".to_string(),
            Value::String(input.password_hash),
        );
        doc.insert(
            "role_id".to_string(),
            Value::String(input.role_id.to_string()),
        );
        doc.insert("google".to_string(), Value::Bool(input.google));

        let created = self.store.insert(EntityKind::User, doc).await?;
        let user: User = from_document(created)?;
        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    async fn get(&self, id: Uuid) -> AppResult<User> {
        let doc = self
            .store
            .find_by_id(EntityKind::User, id)
            .await?
            .ok_or_not_found()?;
        Ok(from_document(doc)?)
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let docs = self
            .store
            .find_exact(EntityKind::User, Document::new())
            .await?;
        docs.into_iter()
            .map(|doc| Ok(from_document(doc)?))
            .collect()
    }

    async fn update(&self, requester_id: Uuid, id: Uuid, input: UpdateUser) -> AppResult<User> {
        // Ensure the target exists before authorizing, so a missing account
        // reads as NotFound rather than a denied update.
        self.store
            .find_by_id(EntityKind::User, id)
            .await?
            .ok_or_not_found()?;

        run_guards([owner_guard(requester_id, id)])?;

        let mut patch = Document::new();

        if let Some(raw) = input.name {
            let name = normalize(&raw, NameStyle::Title);
            if name.display.is_empty() {
                return Err(AppError::validation("name must not be blank"));
            }
            patch.insert("name".to_string(), Value::String(name.display));
            patch.insert("lower".to_string(), Value::String(name.search_key));
        }
        if let Some(email) = input.email {
            self.ensure_email_free(&email, Some(id)).await?;
            patch.insert("email".to_string(), Value::String(email));
        }
        if let Some(hash) = input.password_hash {
            patch.insert("password_hash".to_string(), Value::String(hash));
        }
        if let Some(role_id) = input.role_id {
            self.ensure_role_exists(role_id).await?;
            patch.insert("role_id".to_string(), Value::String(role_id.to_string()));
        }

        let updated = self.store.update(EntityKind::User, id, patch).await?;
        Ok(from_document(updated)?)
    }

    async fn soft_delete(&self, requester_role_id: Uuid, id: Uuid) -> AppResult<User> {
        let role = self.roles.get(requester_role_id).await?;
        run_guards([role_guard(&role.name, DESTRUCTIVE_ROLES)])?;

        let deleted = self.store.soft_delete(EntityKind::User, id).await?;
        let user: User = from_document(deleted)?;
        tracing::info!(user_id = %user.id, "user soft-deleted");
        Ok(user)
    }

    async fn set_avatar(&self, id: Uuid, bytes: Vec<u8>) -> AppResult<User> {
        let linked = self
            .saga
            .replace_asset(EntityKind::User, id, bytes, FOLDER_USERS, "avatar")
            .await?;
        Ok(from_document(linked)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ROLE_ADMIN, ROLE_USER};
    use crate::domain::Role;
    use crate::infra::backends::DocumentBackend;
    use crate::infra::MockAssetStore;
    use crate::services::roles::{RoleManager, RoleService};

    async fn setup() -> (Arc<dyn QueryAdapter>, Arc<RoleManager>, UserManager) {
        let store: Arc<dyn QueryAdapter> = Arc::new(DocumentBackend::new());
        let roles = Arc::new(RoleManager::new(Arc::clone(&store)));
        roles.seed().await.unwrap();

        let assets = Arc::new(MockAssetStore::new());
        let users = UserManager::new(Arc::clone(&store), roles.clone(), assets);
        (store, roles, users)
    }

    async fn role(roles: &RoleManager, name: &str) -> Role {
        roles.find_by_name(name).await.unwrap()
    }

    fn input(name: &str, email: &str, role_id: Uuid) -> CreateUser {
        CreateUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role_id,
            google: false,
        }
    }

    #[tokio::test]
    async fn create_normalizes_name_per_word() {
        let (_, roles, users) = setup().await;
        let user_role = role(&roles, ROLE_USER).await;

        let user = users
            .create(input("  ada   LOVELACE ", "ada@example.com", user_role.id))
            .await
            .unwrap();

        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.lower, "ada lovelace");
        assert!(user.state);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (_, roles, users) = setup().await;
        let user_role = role(&roles, ROLE_USER).await;

        users
            .create(input("Ada", "ada@example.com", user_role.id))
            .await
            .unwrap();
        let err = users
            .create(input("Other", "ada@example.com", user_role.id))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_NAME");
    }

    #[tokio::test]
    async fn unknown_role_is_a_validation_error() {
        let (_, _, users) = setup().await;
        let err = users
            .create(input("Ada", "ada@example.com", Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_REJECTED");
    }

    #[tokio::test]
    async fn only_the_account_holder_may_update() {
        let (_, roles, users) = setup().await;
        let user_role = role(&roles, ROLE_USER).await;

        let ada = users
            .create(input("Ada", "ada@example.com", user_role.id))
            .await
            .unwrap();

        let err = users
            .update(
                Uuid::new_v4(),
                ada.id,
                UpdateUser {
                    name: Some("Mallory".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED_OWNERSHIP");

        let updated = users
            .update(
                ada.id,
                ada.id,
                UpdateUser {
                    name: Some("ada byron".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada Byron");
    }

    #[tokio::test]
    async fn soft_delete_requires_a_destructive_role() {
        let (_, roles, users) = setup().await;
        let user_role = role(&roles, ROLE_USER).await;
        let admin_role = role(&roles, ROLE_ADMIN).await;

        let ada = users
            .create(input("Ada", "ada@example.com", user_role.id))
            .await
            .unwrap();

        let err = users.soft_delete(user_role.id, ada.id).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED_ROLE");

        let deleted = users.soft_delete(admin_role.id, ada.id).await.unwrap();
        assert!(!deleted.state);

        // Deleted accounts stay fetchable by id but vanish from listings.
        let fetched = users.get(ada.id).await.unwrap();
        assert!(!fetched.is_active());
        assert!(users.list().await.unwrap().is_empty());
    }
}

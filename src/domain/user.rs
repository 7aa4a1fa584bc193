//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Lowercase search key, kept consistent with `name`
    pub lower: String,
    pub email: String,
    /// Pre-hashed credential; never exposed by response shaping, which lives
    /// outside this core
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub role_id: Uuid,
    /// Whether the account is linked to a Google identity
    pub google: bool,
    /// Soft-delete flag; false means deleted
    pub state: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check if user is active (not soft-deleted)
    pub fn is_active(&self) -> bool {
        self.state
    }
}

/// User creation data transfer object.
///
/// The password arrives already hashed; hashing and credential checks belong
/// to the authentication collaborator, not this core.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: Uuid,
    #[serde(default)]
    pub google: bool,
}

/// User update data transfer object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role_id: Option<Uuid>,
}

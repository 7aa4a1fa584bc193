//! Category domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    /// Lowercase search key, kept consistent with `name`
    pub lower: String,
    /// Creating user; assigned once, never reassigned
    pub owner_id: Uuid,
    /// Soft-delete flag; false means deleted
    pub state: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn is_active(&self) -> bool {
        self.state
    }
}

/// Category creation data transfer object
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategory {
    pub name: String,
}

/// Category update data transfer object; only the name can change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
}

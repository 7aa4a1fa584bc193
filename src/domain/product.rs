//! Product domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Lowercase search key, kept consistent with `name`
    pub lower: String,
    pub price: f64,
    pub description: String,
    pub available: bool,
    /// Public reference to the hosted image, when one is linked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    /// Creating user; assigned once, never reassigned
    pub owner_id: Uuid,
    /// Must reference an active category at write time
    pub category_id: Uuid,
    /// Soft-delete flag; false means deleted
    pub state: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_active(&self) -> bool {
        self.state
    }
}

/// Product creation data transfer object
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub category_id: Uuid,
    #[serde(default = "default_true")]
    pub available: bool,
}

fn default_true() -> bool {
    true
}

/// Product update data transfer object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub available: Option<bool>,
}

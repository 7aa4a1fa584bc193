//! Role domain entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role record. The role set is fixed and seeded at startup; a role is
/// immutable once any user references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
}

//! Application-wide constants
//!
//! Centralized location for magic values to improve maintainability.

// =============================================================================
// Roles
// =============================================================================

/// Administrator role with full privileges
pub const ROLE_ADMIN: &str = "ADMIN_ROLE";

/// Worker role allowed to modify registers
pub const ROLE_WORKER: &str = "WORKER_ROLE";

/// Default role assigned to new users
pub const ROLE_USER: &str = "USER_ROLE";

/// All roles seeded at startup
pub const SEEDED_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_WORKER, ROLE_USER];

/// Roles allowed to perform destructive operations (soft deletes)
pub const DESTRUCTIVE_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_WORKER];

// =============================================================================
// Asset store
// =============================================================================

/// Folder for user avatars
pub const FOLDER_USERS: &str = "users";

/// Folder for product images
pub const FOLDER_PRODUCTS: &str = "products";

// =============================================================================
// Search
// =============================================================================

/// Collections the search facade recognizes; anything else yields empty results
pub const SEARCHABLE_COLLECTIONS: &[&str] = &["users", "categories", "products"];

// =============================================================================
// Domain defaults
// =============================================================================

/// Description assigned to products created without one
pub const DEFAULT_PRODUCT_DESCRIPTION: &str = "No description";

// =============================================================================
// Storage defaults (development)
// =============================================================================

/// Default relational database URL
pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

/// Default path for the embedded range store file
pub const DEFAULT_STORE_PATH: &str = "storefront.redb";

/// Default directory for locally hosted assets
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";

/// Default public base URL for locally hosted assets
pub const DEFAULT_ASSET_BASE_URL: &str = "http://localhost:3000/uploads";

//! Application settings loaded from environment variables.

use std::env;

use super::constants::{
    DEFAULT_ASSET_BASE_URL, DEFAULT_DATABASE_URL, DEFAULT_STORE_PATH, DEFAULT_UPLOADS_DIR,
};

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub store_path: String,
    pub uploads_dir: String,
    pub asset_base_url: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("store_path", &self.store_path)
            .field("uploads_dir", &self.uploads_dir)
            .field("asset_base_url", &self.asset_base_url)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            store_path: env::var("STORE_PATH").unwrap_or_else(|_| DEFAULT_STORE_PATH.to_string()),
            uploads_dir: env::var("UPLOADS_DIR")
                .unwrap_or_else(|_| DEFAULT_UPLOADS_DIR.to_string()),
            asset_base_url: env::var("PUBLIC_ASSET_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_ASSET_BASE_URL.to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            store_path: DEFAULT_STORE_PATH.to_string(),
            uploads_dir: DEFAULT_UPLOADS_DIR.to_string(),
            asset_base_url: DEFAULT_ASSET_BASE_URL.to_string(),
        }
    }
}

//! Asset store collaborator.
//!
//! The saga only ever sees this trait: upload bytes under a key inside a
//! folder and get back a public reference, or remove a previously stored
//! asset. The shipping implementation hosts files locally under a configured
//! uploads directory; tests substitute a mock with the same contract.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// A successfully stored asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Public reference persisted on the owning entity
    pub url: String,
    /// Key under which the asset is stored; uploads with the same key
    /// overwrite rather than duplicate
    pub key: String,
}

/// Transport failure talking to the asset store.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset transport failure: {0}")]
    Transport(String),

    #[error("asset io failure: {0}")]
    Io(#[from] std::io::Error),
}

/// External object store holding entity images.
///
/// The borrowed arguments carry named lifetimes so the generated mock can
/// express them.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `bytes` under `key` (a fresh key is generated when absent)
    /// inside `folder`; returns the public reference.
    async fn upload<'a>(
        &self,
        bytes: Vec<u8>,
        key: Option<&'a str>,
        folder: &'a str,
    ) -> Result<StoredAsset, AssetError>;

    /// Remove a stored asset by key or by its public URL.
    async fn remove<'a>(&self, key_or_url: &'a str, folder: &'a str)
        -> Result<(), AssetError>;
}

/// Filesystem-backed asset store serving files from a public base URL.
pub struct LocalAssetStore {
    root: PathBuf,
    base_url: String,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.uploads_dir, &config.asset_base_url)
    }

    /// Reduce a key or public URL to the bare stored key.
    fn bare_key(&self, key_or_url: &str) -> String {
        let trimmed = key_or_url
            .strip_prefix(&self.base_url)
            .unwrap_or(key_or_url);
        Path::new(trimmed)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| trimmed.to_string())
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn upload<'a>(
        &self,
        bytes: Vec<u8>,
        key: Option<&'a str>,
        folder: &'a str,
    ) -> Result<StoredAsset, AssetError> {
        let key = match key {
            Some(k) => self.bare_key(k),
            None => Uuid::new_v4().to_string(),
        };

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&key), bytes).await?;

        Ok(StoredAsset {
            url: format!("{}/{}/{}", self.base_url, folder, key),
            key,
        })
    }

    async fn remove<'a>(
        &self,
        key_or_url: &'a str,
        folder: &'a str,
    ) -> Result<(), AssetError> {
        let key = self.bare_key(key_or_url);
        let path = self.root.join(folder).join(&key);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // Removing an already-absent asset is not a failure
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_store_accepts_borrowed_keys() {
        let mut assets = MockAssetStore::new();
        assets
            .expect_upload()
            .withf(|bytes, key, folder| {
                bytes.as_slice() == [1, 2] && key == &Some("abc") && folder == "products"
            })
            .returning(|_, key, folder| {
                let key = key.unwrap_or_default().to_string();
                Ok(StoredAsset {
                    url: format!("http://assets.local/{folder}/{key}"),
                    key,
                })
            });
        assets.expect_remove().returning(|_, _| Ok(()));

        let stored = assets
            .upload(vec![1, 2], Some("abc"), "products")
            .await
            .unwrap();
        assert_eq!(stored.key, "abc");
        assert_eq!(stored.url, "http://assets.local/products/abc");
        assets.remove(&stored.url, "products").await.unwrap();
    }

    #[tokio::test]
    async fn local_store_round_trips_and_overwrites_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalAssetStore::new(dir.path(), "http://localhost:3000/uploads");

        let first = store.upload(vec![1], Some("item"), "products").await.unwrap();
        assert_eq!(first.url, "http://localhost:3000/uploads/products/item");

        // Same key overwrites rather than duplicates.
        store.upload(vec![2, 3], Some("item"), "products").await.unwrap();
        let on_disk = std::fs::read(dir.path().join("products").join("item")).unwrap();
        assert_eq!(on_disk, vec![2, 3]);

        // Removal accepts the public URL and tolerates a repeat.
        store.remove(&first.url, "products").await.unwrap();
        assert!(!dir.path().join("products").join("item").exists());
        store.remove("item", "products").await.unwrap();
    }
}

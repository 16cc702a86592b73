//! Filesystem storage handler
//!
//! Stores each key as a `.dat` file under a base directory. Keys may contain
//! `/`, which maps to subdirectories.

use crate::effects::StorageEffects;
use crate::errors::{QuorumError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Filesystem-based storage handler
#[derive(Debug, Clone)]
pub struct FilesystemStorageHandler {
    /// Base directory for storage files
    base_path: PathBuf,
}

impl FilesystemStorageHandler {
    /// Create a new filesystem storage handler
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Base directory
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(QuorumError::storage("Key cannot be empty"));
        }
        let relative = Path::new(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(QuorumError::storage(format!("Invalid storage key: {key}")));
        }
        Ok(self.base_path.join(format!("{key}.dat")))
    }
}

#[async_trait]
impl StorageEffects for FilesystemStorageHandler {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let file_path = self.path_for(key)?;
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                QuorumError::storage(format!("Failed to create directory: {e}"))
            })?;
        }

        fs::write(&file_path, value)
            .await
            .map_err(|e| QuorumError::storage(format!("Failed to write file: {e}")))?;

        tracing::trace!(key, "stored value");
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let file_path = self.path_for(key)?;
        match fs::read(&file_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(QuorumError::storage(format!("Failed to read file: {e}"))),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let file_path = self.path_for(key)?;
        match fs::remove_file(&file_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(QuorumError::storage(format!("Failed to remove file: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_retrieve_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorageHandler::new(dir.path());

        assert_eq!(storage.retrieve("auth/0xabc").await.unwrap(), None);
        storage.store("auth/0xabc", b"value".to_vec()).await.unwrap();
        assert_eq!(
            storage.retrieve("auth/0xabc").await.unwrap(),
            Some(b"value".to_vec())
        );
        assert!(storage.remove("auth/0xabc").await.unwrap());
        assert!(!storage.remove("auth/0xabc").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorageHandler::new(dir.path());
        assert!(storage.store("../outside", vec![1]).await.is_err());
        assert!(storage.store("", vec![1]).await.is_err());
    }
}

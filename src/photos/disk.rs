/// Disk-based photo backend
use crate::{
    error::{CivicError, CivicResult},
    photos::PhotoBackend,
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Stores photos under `{base}/{first two chars of key}/{key}`
#[derive(Clone)]
pub struct DiskPhotoBackend {
    base_path: PathBuf,
}

impl DiskPhotoBackend {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn photo_path(&self, key: &str) -> PathBuf {
        match key.get(0..2) {
            Some(shard) => self.base_path.join(shard).join(key),
            None => self.base_path.join("_").join(key),
        }
    }
}

#[async_trait]
impl PhotoBackend for DiskPhotoBackend {
    async fn put(&self, key: &str, data: Vec<u8>) -> CivicResult<()> {
        let path = self.photo_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                CivicError::PhotoStorage(format!("Failed to create photo directory: {}", e))
            })?;
        }

        fs::write(&path, data)
            .await
            .map_err(|e| CivicError::PhotoStorage(format!("Failed to write photo {}: {}", key, e)))
    }

    async fn get(&self, key: &str) -> CivicResult<Option<Vec<u8>>> {
        match fs::read(self.photo_path(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CivicError::PhotoStorage(format!(
                "Failed to read photo {}: {}",
                key, e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> CivicResult<()> {
        match fs::remove_file(self.photo_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CivicError::PhotoStorage(format!(
                "Failed to delete photo {}: {}",
                key, e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> CivicResult<bool> {
        Ok(fs::try_exists(self.photo_path(key)).await.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempdir().unwrap();
        let backend = DiskPhotoBackend::new(dir.path().to_path_buf());

        backend.put("ab12.png", b"png bytes".to_vec()).await.unwrap();
        assert_eq!(
            backend.get("ab12.png").await.unwrap(),
            Some(b"png bytes".to_vec())
        );
        assert!(dir.path().join("ab").join("ab12.png").exists());

        backend.delete("ab12.png").await.unwrap();
        assert!(!backend.exists("ab12.png").await.unwrap());
        assert_eq!(backend.get("ab12.png").await.unwrap(), None);

        // Deleting twice is fine
        backend.delete("ab12.png").await.unwrap();
    }
}

/// Photo storage for issue reports
///
/// Uploaded photos are sniffed, size-checked and stored under a
/// content-addressed key. Backends are pluggable; the disk backend is the
/// only one shipped.

pub mod disk;
pub mod store;

pub use disk::DiskPhotoBackend;
pub use store::{PhotoStore, StoredPhoto};

use crate::error::CivicResult;
use async_trait::async_trait;

/// Photo storage backend
#[async_trait]
pub trait PhotoBackend: Send + Sync {
    /// Store bytes under `key`, overwriting any existing photo
    async fn put(&self, key: &str, data: Vec<u8>) -> CivicResult<()>;

    /// Fetch a photo
    async fn get(&self, key: &str) -> CivicResult<Option<Vec<u8>>>;

    /// Remove a photo; removing a missing photo is not an error
    async fn delete(&self, key: &str) -> CivicResult<()>;

    async fn exists(&self, key: &str) -> CivicResult<bool>;
}

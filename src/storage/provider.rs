use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Blob storage provider trait
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Write data under `key`, replacing any existing blob
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Read a blob. A missing blob is `AppError::NotFound`.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Remove a blob. Removing a missing blob succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Get the storage type name
    fn storage_type(&self) -> &'static str;
}

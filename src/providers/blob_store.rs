//! Blob store provider trait for raw uploaded files

use async_trait::async_trait;

use crate::error::Result;

/// Trait for raw file storage
///
/// Implementations:
/// - `LocalBlobStore`: local filesystem
///
/// Paths are opaque references recorded on the `Document` row.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store raw bytes under a path, creating parents as needed
    async fn upload(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Fetch raw bytes; errors when the path does not exist
    async fn download(&self, path: &str) -> Result<Vec<u8>>;

    /// Remove a stored blob; removing a missing blob is not an error
    async fn delete(&self, path: &str) -> Result<()>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

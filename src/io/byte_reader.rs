use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Abstraction for byte-level I/O operations
/// This trait lets the delimited parser run against local files in production
/// and in-memory buffers in tests, without touching the storage layer
#[async_trait]
pub trait ByteReader: Send + Sync {
    /// Path (or label) of the underlying source, used in diagnostics
    fn location(&self) -> &Path;

    /// Get the total size of the file in bytes
    async fn size(&self) -> Result<u64>;

    /// Read a range of bytes from the file
    async fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>>;

    /// Read the whole file
    async fn read_all(&self) -> Result<Vec<u8>> {
        let size = self.size().await?;
        self.read_range(0, size).await
    }
}

//! Content-addressed storage for report files.
//!
//! Report metadata lives in the database; the bytes live here, keyed by the
//! SHA-256 of their content so that re-uploading an identical file costs
//! nothing and a blob can be dropped once no report points at it.

mod error;
mod filesystem;
mod hash;
mod memory;

use async_trait::async_trait;

pub use error::StorageError;
pub use filesystem::FilesystemBlobStore;
pub use hash::ContentHash;
pub use memory::MemoryBlobStore;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data`, returning its content hash. Storing existing content is a no-op.
    async fn put(&self, data: &[u8]) -> Result<ContentHash, StorageError>;

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError>;
}

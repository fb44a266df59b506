use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BlobStore, ContentHash, StorageError};

/// Blob store kept entirely in memory. Used by tests and throwaway servers.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<ContentHash, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: &[u8]) -> Result<ContentHash, StorageError> {
        let hash = ContentHash::of(data);
        self.blobs
            .write()
            .await
            .entry(hash)
            .or_insert_with(|| data.to_vec());
        Ok(hash)
    }

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .read()
            .await
            .get(hash)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(hash.to_hex()))
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        Ok(self.blobs.write().await.remove(hash).is_some())
    }
}

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{BlobStore, ContentHash, StorageError};

const TMP_DIR: &str = ".tmp";

/// Blobs on local disk, sharded as `{root}/{hash[..2]}/{hash[2..]}`.
///
/// Writes go to `{root}/.tmp` first and are renamed into place, so a reader
/// never sees a partially written file.
pub struct FilesystemBlobStore {
    root: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    pub async fn open(root: impl Into<PathBuf>, max_size: u64) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(root.join(TMP_DIR)).await?;
        Ok(Self { root, max_size })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, hash: &ContentHash) -> PathBuf {
        let (dir, file) = hash.shard();
        self.root.join(dir).join(file)
    }

    async fn write_atomically(&self, target: &Path, data: &[u8]) -> Result<(), StorageError> {
        let tmp = self
            .root
            .join(TMP_DIR)
            .join(uuid::Uuid::new_v4().to_string());

        let result = async {
            fs::write(&tmp, data).await?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::rename(&tmp, target).await
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp).await;
        }
        Ok(result?)
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, data: &[u8]) -> Result<ContentHash, StorageError> {
        let size = data.len() as u64;
        if size > self.max_size {
            return Err(StorageError::TooLarge {
                actual: size,
                limit: self.max_size,
            });
        }

        let hash = ContentHash::of(data);
        let path = self.path_of(&hash);
        if !fs::try_exists(&path).await? {
            self.write_atomically(&path, data).await?;
        }
        Ok(hash)
    }

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.path_of(hash)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(hash.to_hex())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        match fs::remove_file(self.path_of(hash)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

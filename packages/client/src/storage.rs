use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::DocumentError;

/// Where the local notes document lives. Holds one opaque JSON string.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// `None` when nothing has been written yet.
    async fn read(&self) -> Result<Option<String>, DocumentError>;

    async fn write(&self, document: &str) -> Result<(), DocumentError>;
}

/// The notes document as a JSON file on disk.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentStorage for FileStorage {
    async fn read(&self) -> Result<Option<String>, DocumentError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, document: &str) -> Result<(), DocumentError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).await?;

        let tmp = dir.join(format!(".notes-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, document).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// In-process storage, lost on drop.
#[derive(Default)]
pub struct MemoryStorage {
    document: RwLock<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: RwLock::new(Some(document.into())),
        }
    }
}

#[async_trait]
impl DocumentStorage for MemoryStorage {
    async fn read(&self) -> Result<Option<String>, DocumentError> {
        Ok(self.document.read().await.clone())
    }

    async fn write(&self, document: &str) -> Result<(), DocumentError> {
        *self.document.write().await = Some(document.to_string());
        Ok(())
    }
}

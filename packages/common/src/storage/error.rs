use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    TooLarge { actual: u64, limit: u64 },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

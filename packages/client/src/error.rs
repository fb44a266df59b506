use thiserror::Error;

/// Outcome of a failed backend call.
///
/// Only [`CallError::Unreachable`] is a transport failure; every other variant
/// means the request was refused or answered, and must not trigger a local
/// fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// A required identifier was missing or blank. Nothing was sent.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Application { status: u16, message: String },

    #[error("not found")]
    NotFound,

    /// The backend cannot perform this operation (e.g. report files offline).
    #[error("operation not supported by this backend")]
    Unsupported,

    /// No response was obtained, or the circuit breaker is open.
    #[error("server unreachable: {0}")]
    Unreachable(String),
}

impl CallError {
    pub fn is_transport(&self) -> bool {
        matches!(self, CallError::Unreachable(_))
    }
}

pub type CallResult<T> = Result<T, CallError>;

/// Failure reading or writing the local notes document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

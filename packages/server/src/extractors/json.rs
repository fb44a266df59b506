use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON body that may be missing altogether. An empty body or a literal
/// `null` yields `T::default()`, and the `Content-Type` header is not required.
pub struct LenientJson<T>(pub T);

impl<S, T> FromRequest<S> for LenientJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(LenientJson(T::default()));
        }

        let value: Option<T> = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::Validation(format!("Invalid JSON body: {e}")))?;
        Ok(LenientJson(value.unwrap_or_default()))
    }
}

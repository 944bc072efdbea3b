use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::services::storage::StorageError;

/// Handler-level error type. Implements [`IntoResponse`] to produce the
/// `{"detail": ...}` JSON bodies the API contract promises.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad input: wrong file type, oversized file, missing or empty
    /// reference set.
    #[error("{0}")]
    Validation(String),

    /// Unknown job or image id.
    #[error("{0}")]
    NotFound(String),

    /// Filesystem failure reading or writing image bytes.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Validation(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            ApiError::Storage(StorageError::ReferenceNotFound(id)) => (
                StatusCode::NOT_FOUND,
                format!("Reference image not found: {id}"),
            ),
            ApiError::Storage(err) => {
                tracing::error!(error = %err, "Storage operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage operation failed".to_string(),
                )
            }
        };

        (status, axum::Json(json!({ "detail": detail }))).into_response()
    }
}

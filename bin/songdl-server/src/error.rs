//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! **Security note:** Internal errors are logged with full detail but only a
//! generic message is returned to the caller so that file paths or tool
//! output beyond the intended excerpt never leak to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use songdl_core::{DownloadError, ResolveError};
use thiserror::Error;
use tracing::{error, warn};

/// All errors that can occur in the songdl-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A failed `/api/download` request; rendered with `success: false`.
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller asked for something outside what it may access.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ResolveError> for ServerError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Forbidden => ServerError::Forbidden("access denied".into()),
            ResolveError::NotFound => ServerError::NotFound("file not found".into()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::Download(e) => {
                let status = if e.is_client_error() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                match &e {
                    DownloadError::Internal(detail) => {
                        error!(kind = e.kind(), detail = %detail, "download failed")
                    }
                    DownloadError::InvalidInput(_) => {}
                    _ => warn!(kind = e.kind(), error = %e, "download failed"),
                }
                (
                    status,
                    Json(json!({ "success": false, "error": e.to_string() })),
                )
                    .into_response()
            }
            ServerError::NotFound(m) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response()
            }
            ServerError::Forbidden(m) => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": m }))).into_response()
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

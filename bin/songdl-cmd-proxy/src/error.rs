//! Proxy error type; every variant renders as `{ok: false, error, ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use songdl_core::ProcessError;
use thiserror::Error;
use tracing::warn;

use crate::policy::PolicyViolation;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("cmd is required")]
    EmptyCommand,

    #[error("{0}")]
    Forbidden(#[from] PolicyViolation),

    #[error("unauthorized")]
    Unauthorized,

    /// The command ran (or tried to) and did not succeed.
    #[error("{error}")]
    Execution { error: String, stderr: String },
}

impl From<ProcessError> for ProxyError {
    fn from(e: ProcessError) -> Self {
        ProxyError::Execution {
            error: e.to_string(),
            stderr: e.stderr().to_owned(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::EmptyCommand => StatusCode::BAD_REQUEST,
            ProxyError::Forbidden(_) => StatusCode::FORBIDDEN,
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            ProxyError::Execution { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match self {
            ProxyError::Execution { error, stderr } => {
                warn!(error = %error, "command failed");
                (
                    status,
                    Json(json!({ "ok": false, "error": error, "stderr": stderr })),
                )
                    .into_response()
            }
            other => {
                warn!(status = status.as_u16(), error = %other, "command rejected");
                (status, Json(json!({ "ok": false, "error": other.to_string() }))).into_response()
            }
        }
    }
}

use axum::http::{header, HeaderMap};

use crate::error::ProxyError;

/// Require `Authorization: Bearer <expected>`.
pub fn require_bearer(headers: &HeaderMap, expected: &str) -> Result<(), ProxyError> {
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match provided {
        Some(token) if token == expected => Ok(()),
        _ => Err(ProxyError::Unauthorized),
    }
}

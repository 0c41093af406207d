//! Song download endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use songdl_core::{DownloadError, DownloadRequest};
use tracing::debug;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::download::{DownloadBody, DownloadFailure, DownloadResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(download),
    components(schemas(DownloadBody, DownloadResponse, DownloadFailure)),
)]
pub struct DownloadApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/download", post(download))
}

/// Download a song (`POST /api/download`).
///
/// Runs the download tool synchronously; the response carries a relative
/// `downloadUrl` valid until the artifact is cleaned up (one hour by default).
#[utoipa::path(
    post,
    path = "/api/download",
    tag = "download",
    request_body = DownloadBody,
    responses(
        (status = 200, description = "Song downloaded", body = DownloadResponse),
        (status = 400, description = "Missing or invalid URL, unsupported format", body = DownloadFailure),
        (status = 500, description = "Download tool failure", body = DownloadFailure),
    )
)]
pub async fn download(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DownloadBody>, JsonRejection>,
) -> Result<Json<DownloadResponse>, ServerError> {
    let Json(body) = body.map_err(|e| {
        debug!(error = %e, "rejected download body");
        DownloadError::invalid_input("request body must be a JSON object with a url field")
    })?;

    let request = DownloadRequest::parse(body.url.as_deref(), body.format.as_deref())?;
    let outcome = state.orchestrator.handle_download(request).await?;
    Ok(Json(outcome.into()))
}

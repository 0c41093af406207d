//! Artifact retrieval (`GET /downloads/{filename}`).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use songdl_core::resolve_within;
use tokio_util::io::ReaderStream;
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::download::ErrorBody;
use crate::state::AppState;

/// Every artifact is served with this type regardless of its container.
pub const ARTIFACT_CONTENT_TYPE: &str = "audio/mpeg";

#[derive(OpenApi)]
#[openapi(paths(serve_artifact), components(schemas(ErrorBody)))]
pub struct FilesApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/downloads/{filename}", get(serve_artifact))
}

#[utoipa::path(
    get,
    path = "/downloads/{filename}",
    tag = "download",
    params(("filename" = String, Path, description = "Artifact name returned by /api/download")),
    responses(
        (status = 200, description = "Audio file stream", content_type = "audio/mpeg"),
        (status = 403, description = "Path outside the download directory", body = ErrorBody),
        (status = 404, description = "No such artifact", body = ErrorBody),
    )
)]
pub async fn serve_artifact(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ServerError> {
    let path = resolve_within(&state.orchestrator.settings().output_dir, &filename).await?;

    // The janitor may delete the file between resolution and open.
    let file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServerError::NotFound("file not found".into()));
        }
        Err(e) => return Err(ServerError::Internal(format!("open {}: {e}", path.display()))),
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(ARTIFACT_CONTENT_TYPE));
    headers.insert(header::CONTENT_DISPOSITION, attachment(&filename));
    if let Ok(meta) = file.metadata().await {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.len()));
    }

    info!(filename = %filename, "serving artifact");
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

/// `attachment; filename="<name>"` with characters that would break the
/// quoted string replaced.
fn attachment(filename: &str) -> HeaderValue {
    let safe: String = filename
        .chars()
        .map(|c| if c == '"' || c == '\\' || !(' '..='~').contains(&c) { '_' } else { c })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn attachment_quotes_plain_names() {
        assert_eq!(
            attachment("song_1.mp3").to_str().unwrap(),
            "attachment; filename=\"song_1.mp3\""
        );
    }

    #[test]
    fn attachment_replaces_unsafe_characters() {
        assert_eq!(
            attachment("a\"b\\ñ.mp3").to_str().unwrap(),
            "attachment; filename=\"a_b__.mp3\""
        );
    }
}

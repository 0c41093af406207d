use serde::{Deserialize, Serialize};
use songdl_core::DownloadOutcome;
use utoipa::ToSchema;

/// Body of `POST /api/download`.
///
/// Both fields are kept as raw strings so validation failures surface as
/// `{success: false, error}` instead of a deserialisation rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DownloadBody {
    /// Song URL understood by the download tool.
    #[schema(example = "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC")]
    pub url: Option<String>,
    /// One of `mp3`, `m4a`, `flac`, `wav` (default `mp3`, also for `null`).
    #[schema(example = "mp3")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub success: bool,
    pub title: String,
    pub artist: String,
    pub format: String,
    pub filename: String,
    /// Relative URL the artifact can be fetched from.
    pub download_url: String,
}

impl From<DownloadOutcome> for DownloadResponse {
    fn from(o: DownloadOutcome) -> Self {
        Self {
            success: true,
            title: o.title,
            artist: o.artist,
            format: o.format.to_string(),
            filename: o.filename,
            download_url: o.download_url,
        }
    }
}

/// Failure body of `POST /api/download`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DownloadFailure {
    pub success: bool,
    pub error: String,
}

/// Failure body of every other route.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

//! Failure kinds of a download job and the heuristic that derives them from
//! the converter's diagnostics.

use std::time::Duration;

use thiserror::Error;

use crate::process::ProcessError;

/// Maximum number of characters of converter stderr carried by
/// [`DownloadError::ToolError`].
pub const STDERR_EXCERPT_CHARS: usize = 200;

/// Exactly one of these is reported for every failed download request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DownloadError {
    /// The converter is not installed and could not be installed.
    #[error("download tool unavailable; install spotdl or check SONGDL_TOOL")]
    ToolUnavailable,

    /// The request was rejected before any process was spawned.
    #[error("{0}")]
    InvalidInput(String),

    /// The converter exceeded its allotted time.
    #[error("download took too long; try another song")]
    Timeout(Duration),

    /// The song (or the produced file) could not be found.
    #[error("{0}")]
    NotFound(String),

    /// The upstream service refused further downloads for now.
    #[error("download limit reached; try again later")]
    RateLimited,

    /// Generic converter failure carrying a truncated stderr excerpt.
    #[error("download tool error: {0}")]
    ToolError(String),

    /// Anything else; detail is logged, not shown.
    #[error("internal server error")]
    Internal(String),
}

impl DownloadError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        DownloadError::InvalidInput(message.into())
    }

    /// The converter itself reported that the song does not exist.
    pub fn song_not_found() -> Self {
        DownloadError::NotFound("song not found; check the URL".to_owned())
    }

    /// Neither the canonical nor the fallback discovery produced a file.
    pub fn artifact_missing() -> Self {
        DownloadError::NotFound("download failed or file not found".to_owned())
    }

    /// Short machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadError::ToolUnavailable => "tool_unavailable",
            DownloadError::InvalidInput(_) => "invalid_input",
            DownloadError::Timeout(_) => "timeout",
            DownloadError::NotFound(_) => "not_found",
            DownloadError::RateLimited => "rate_limited",
            DownloadError::ToolError(_) => "tool_error",
            DownloadError::Internal(_) => "internal",
        }
    }

    /// Client-side mistakes map to 4xx, everything else to 5xx.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DownloadError::InvalidInput(_))
    }
}

impl From<ProcessError> for DownloadError {
    fn from(e: ProcessError) -> Self {
        match &e {
            ProcessError::TimedOut { after } => classify_failure(Some(*after), &e.to_string(), ""),
            ProcessError::Failed { stderr, .. } => classify_failure(None, &e.to_string(), stderr),
            ProcessError::Spawn(_) => classify_failure(None, &e.to_string(), ""),
        }
    }
}

const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "rate-limit",
    "ratelimit",
    "too many requests",
    "429",
];

/// Map converter diagnostics onto a [`DownloadError`].
///
/// Best-effort: the checks run in priority order (timeout, not found,
/// rate limiting, any stderr, internal) and the first match wins.
pub fn classify_failure(timed_out: Option<Duration>, message: &str, stderr: &str) -> DownloadError {
    let message_lc = message.to_lowercase();
    let stderr_lc = stderr.to_lowercase();

    if let Some(after) = timed_out {
        return DownloadError::Timeout(after);
    }
    if message_lc.contains("timed out") || message_lc.contains("timeout") {
        return DownloadError::Timeout(Duration::ZERO);
    }
    if message_lc.contains("not found") || stderr_lc.contains("not found") {
        return DownloadError::song_not_found();
    }
    if RATE_LIMIT_MARKERS.iter().any(|m| stderr_lc.contains(m)) {
        return DownloadError::RateLimited;
    }

    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return DownloadError::ToolError(excerpt(stderr, STDERR_EXCERPT_CHARS));
    }
    DownloadError::Internal(message.to_owned())
}

/// First `max_chars` characters of `text`, never splitting a code point.
fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_owned(),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timeout_wins_over_everything() {
        let err = classify_failure(Some(Duration::from_secs(120)), "boom", "song not found");
        assert_eq!(err, DownloadError::Timeout(Duration::from_secs(120)));
    }

    #[test]
    fn timeout_detected_from_message() {
        let err = classify_failure(None, "Command timed out", "");
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn not_found_from_stderr_or_message() {
        assert_eq!(
            classify_failure(None, "exit status 1", "LookupError: Song Not Found").kind(),
            "not_found"
        );
        assert_eq!(
            classify_failure(None, "spotdl: command not found", "").kind(),
            "not_found"
        );
    }

    #[test]
    fn rate_limit_markers() {
        for stderr in [
            "HTTP Error 429",
            "Rate limit exceeded",
            "spotify: too many requests",
        ] {
            assert_eq!(classify_failure(None, "exit status 1", stderr), DownloadError::RateLimited);
        }
    }

    #[test]
    fn generic_stderr_is_truncated() {
        let stderr = "é".repeat(500);
        match classify_failure(None, "exit status 2", &stderr) {
            DownloadError::ToolError(excerpt) => assert_eq!(excerpt.chars().count(), 200),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_stderr_is_internal() {
        let err = classify_failure(None, "exit status 3", "   \n");
        assert_eq!(err.kind(), "internal");
        assert_eq!(err.to_string(), "internal server error");
    }

    #[test]
    fn only_invalid_input_is_a_client_error() {
        assert!(DownloadError::invalid_input("x").is_client_error());
        assert!(!DownloadError::artifact_missing().is_client_error());
        assert!(!DownloadError::ToolUnavailable.is_client_error());
    }

    #[test]
    fn process_timeout_converts_to_timeout() {
        let err: DownloadError = ProcessError::TimedOut { after: Duration::from_secs(5) }.into();
        assert_eq!(err, DownloadError::Timeout(Duration::from_secs(5)));
    }
}

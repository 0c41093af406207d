//! Best-effort track metadata scraped from the converter's progress log.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub const DEFAULT_TITLE: &str = "Downloaded song";
pub const DEFAULT_ARTIST: &str = "Unknown artist";

static PROGRESS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Downloaded:|Downloading:)\s*(.+?)(?:\s*-\s*(.+))?$")
        .expect("progress line pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
}

impl Default for TrackInfo {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_owned(),
            artist: DEFAULT_ARTIST.to_owned(),
        }
    }
}

/// Scan `stdout` for `Downloaded:` / `Downloading:` lines.
///
/// `Artist - Title` fills both fields, a bare name only the title. Later
/// lines override earlier ones; missing lines keep the defaults.
pub fn extract_track_info(stdout: &str) -> TrackInfo {
    let mut info = TrackInfo::default();

    for line in stdout.lines() {
        let line = line.trim_end_matches('\r');
        if !line.contains("Downloaded:") && !line.contains("Downloading:") {
            continue;
        }
        let Some(caps) = PROGRESS_LINE.captures(line) else {
            continue;
        };
        let first = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        match caps.get(2) {
            Some(title) => {
                info.artist = first.to_owned();
                info.title = title.as_str().trim().to_owned();
            }
            None => info.title = first.to_owned(),
        }
    }

    info
}

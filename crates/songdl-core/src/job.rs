//! Job identity and the naming convention of its artifact.
//!
//! A job is named by a millisecond timestamp token; its artifact is
//! `song_<token>.<ext>` in the output directory. [`JobRegistry`] keeps that
//! name unique across concurrent jobs and remembers which names are taken
//! until the janitor removes the file.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::debug;

use crate::format::AudioFormat;

/// Filename prefix shared by every artifact.
pub const FILENAME_PREFIX: &str = "song_";

/// Millisecond timestamp identifying one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobToken(i64);

impl JobToken {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }
}

impl fmt::Display for JobToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One download request's naming context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub token: JobToken,
    pub output_dir: PathBuf,
    pub format: AudioFormat,
}

impl DownloadJob {
    pub fn new(token: JobToken, output_dir: impl Into<PathBuf>, format: AudioFormat) -> Self {
        Self {
            token,
            output_dir: output_dir.into(),
            format,
        }
    }

    /// `song_<token>`
    pub fn prefix(&self) -> String {
        prefix_for(self.token)
    }

    /// `song_<token>.<ext>`
    pub fn canonical_filename(&self) -> String {
        format!("{}.{}", self.prefix(), self.format.extension())
    }

    pub fn canonical_path(&self) -> PathBuf {
        self.output_dir.join(self.canonical_filename())
    }

    /// Output path handed to the converter, ending in its extension
    /// placeholder.
    pub fn output_template(&self, placeholder: &str) -> String {
        self.output_dir
            .join(format!("{}.{}", self.prefix(), placeholder))
            .to_string_lossy()
            .into_owned()
    }

    /// `true` when `filename` was produced for this job: it carries the job
    /// prefix and the requested extension.
    pub fn owns(&self, filename: &str) -> bool {
        self.carries_prefix(filename) && self.format.matches_filename(filename)
    }

    /// `true` for any file named after this job, whatever its extension
    /// (temporary and partial files included).
    pub fn carries_prefix(&self, filename: &str) -> bool {
        has_prefix(filename, &self.prefix())
    }
}

fn prefix_for(token: JobToken) -> String {
    format!("{FILENAME_PREFIX}{token}")
}

/// `filename` starts with `prefix` and the token is not continued by more
/// digits (`song_12` must not own `song_123.mp3`).
fn has_prefix(filename: &str, prefix: &str) -> bool {
    filename
        .strip_prefix(prefix)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_digit()))
}

#[derive(Debug, Default)]
struct RegistryInner {
    last_token: i64,
    /// Prefixes of jobs in flight or published and awaiting cleanup.
    claimed: HashSet<String>,
}

/// Hands out job tokens and tracks which artifact names are spoken for.
#[derive(Debug, Default)]
pub struct JobRegistry {
    inner: Mutex<RegistryInner>,
    discovery: tokio::sync::Mutex<()>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a job: issue a fresh token and claim its prefix.
    pub fn begin(self: &Arc<Self>, output_dir: &Path, format: AudioFormat) -> JobGuard {
        let token = self.claim_next(Utc::now().timestamp_millis());
        JobGuard {
            registry: Arc::clone(self),
            job: DownloadJob::new(token, output_dir, format),
            published: false,
        }
    }

    /// Tokens are wall-clock millis, bumped when needed so they stay
    /// strictly increasing.
    fn claim_next(&self, now_millis: i64) -> JobToken {
        let mut inner = self.lock();
        let next = now_millis.max(inner.last_token + 1);
        inner.last_token = next;
        let token = JobToken(next);
        inner.claimed.insert(prefix_for(token));
        token
    }

    /// `true` when `filename` belongs to a claimed job other than `own`.
    pub fn is_claimed_by_other(&self, filename: &str, own: JobToken) -> bool {
        let own_prefix = prefix_for(own);
        self.lock()
            .claimed
            .iter()
            .any(|p| *p != own_prefix && has_prefix(filename, p))
    }

    /// Release the claim on `filename` (an artifact name or bare prefix).
    pub fn release_filename(&self, filename: &str) {
        let mut inner = self.lock();
        let before = inner.claimed.len();
        inner.claimed.retain(|p| !has_prefix(filename, p));
        if inner.claimed.len() != before {
            debug!(filename, "released artifact claim");
        }
    }

    /// Number of claimed names (in-flight plus published jobs).
    pub fn claimed(&self) -> usize {
        self.lock().claimed.len()
    }

    /// Serialises directory scans and fallback renames across jobs.
    pub async fn discovery_lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.discovery.lock().await
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        // A poisoned lock only means another request panicked mid-update;
        // the set itself is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Holds a job's claim; dropping it without [`JobGuard::publish`] releases
/// the name again.
#[derive(Debug)]
pub struct JobGuard {
    registry: Arc<JobRegistry>,
    job: DownloadJob,
    published: bool,
}

impl JobGuard {
    pub fn job(&self) -> &DownloadJob {
        &self.job
    }

    /// Keep the claim past the end of the request; the janitor releases it
    /// once the artifact is deleted.
    pub fn publish(mut self) -> DownloadJob {
        self.published = true;
        self.job.clone()
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if !self.published {
            self.registry.release_filename(&self.job.prefix());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn job(token: i64, format: AudioFormat) -> DownloadJob {
        DownloadJob::new(JobToken(token), "/srv/downloads", format)
    }

    #[test]
    fn naming_convention() {
        let j = job(1700000000123, AudioFormat::M4a);
        assert_eq!(j.prefix(), "song_1700000000123");
        assert_eq!(j.canonical_filename(), "song_1700000000123.m4a");
        assert_eq!(
            j.canonical_path(),
            PathBuf::from("/srv/downloads/song_1700000000123.m4a")
        );
        assert_eq!(
            j.output_template("{output-ext}"),
            PathBuf::from("/srv/downloads/song_1700000000123.{output-ext}")
                .to_string_lossy()
        );
    }

    #[test]
    fn ownership_checks_prefix_boundary_and_extension() {
        let j = job(12, AudioFormat::Mp3);
        assert!(j.owns("song_12.mp3"));
        assert!(j.owns("song_12 - Artist - Title.mp3"));
        assert!(!j.owns("song_123.mp3"));
        assert!(!j.owns("song_12.wav"));
        assert!(!j.owns("track.mp3"));
    }

    #[test]
    fn prefix_match_ignores_extension() {
        let j = job(12, AudioFormat::Mp3);
        assert!(j.carries_prefix("song_12.mp3"));
        assert!(j.carries_prefix("song_12.webm.part"));
        assert!(!j.carries_prefix("song_123.mp3"));
    }

    #[test]
    fn tokens_strictly_increase_within_one_millisecond() {
        let registry = JobRegistry::new();
        let a = registry.claim_next(1000);
        let b = registry.claim_next(1000);
        let c = registry.claim_next(999);
        assert!(a < b && b < c);
        assert_eq!(registry.claimed(), 3);
    }

    #[test]
    fn dropping_an_unpublished_guard_releases_the_claim() {
        let registry = Arc::new(JobRegistry::new());
        let guard = registry.begin(Path::new("/tmp"), AudioFormat::Mp3);
        assert_eq!(registry.claimed(), 1);
        drop(guard);
        assert_eq!(registry.claimed(), 0);
    }

    #[test]
    fn published_claims_survive_until_released() {
        let registry = Arc::new(JobRegistry::new());
        let guard = registry.begin(Path::new("/tmp"), AudioFormat::Wav);
        let job = guard.publish();
        assert_eq!(registry.claimed(), 1);

        let other = JobToken(job.token.as_millis() + 1);
        assert!(registry.is_claimed_by_other(&job.canonical_filename(), other));
        assert!(!registry.is_claimed_by_other(&job.canonical_filename(), job.token));

        registry.release_filename(&job.canonical_filename());
        assert_eq!(registry.claimed(), 0);
    }
}

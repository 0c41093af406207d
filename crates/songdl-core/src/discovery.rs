//! Locating the file a converter produced for a job.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::error::DownloadError;
use crate::janitor::delete_artifact;
use crate::job::{DownloadJob, JobRegistry};

/// A job's audio file in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub path: PathBuf,
    /// `true` when the file was found by the recency fallback and renamed to
    /// the canonical name.
    pub recovered: bool,
}

struct Entry {
    name: String,
    born: SystemTime,
}

/// Find `job`'s artifact.
///
/// A file carrying the job prefix and extension is used as is. Otherwise the
/// newest file with the right extension born within `window` before `now`
/// (and not claimed by another job) is renamed to the canonical filename.
/// Callers hold [`JobRegistry::discovery_lock`] around this call.
pub async fn discover(
    job: &DownloadJob,
    registry: &JobRegistry,
    window: Duration,
    now: SystemTime,
) -> Result<Artifact, DownloadError> {
    let entries = list_files(job).await?;

    let mut owned: Vec<&Entry> = entries.iter().filter(|e| job.owns(&e.name)).collect();
    owned.sort_by(|a, b| a.name.cmp(&b.name));
    if owned.len() > 1 {
        warn!(
            job = %job.token,
            count = owned.len(),
            "several artifacts carry the job prefix; using the first"
        );
    }
    if let Some(entry) = owned.first() {
        debug!(job = %job.token, filename = %entry.name, "artifact found under job prefix");
        return Ok(Artifact {
            filename: entry.name.clone(),
            path: job.output_dir.join(&entry.name),
            recovered: false,
        });
    }

    let mut candidates: Vec<&Entry> = entries
        .iter()
        .filter(|e| job.format.matches_filename(&e.name))
        .filter(|e| !registry.is_claimed_by_other(&e.name, job.token))
        .filter(|e| age(e.born, now) < window)
        .collect();
    candidates.sort_by(|a, b| b.born.cmp(&a.born));

    let Some(latest) = candidates.first() else {
        warn!(job = %job.token, format = %job.format, "no artifact produced");
        return Err(DownloadError::artifact_missing());
    };

    let filename = job.canonical_filename();
    let path = job.canonical_path();
    tokio::fs::rename(job.output_dir.join(&latest.name), &path)
        .await
        .map_err(|e| DownloadError::Internal(format!("failed to rename {}: {e}", latest.name)))?;

    info!(job = %job.token, from = %latest.name, to = %filename, "recovered artifact by recency");
    Ok(Artifact {
        filename,
        path,
        recovered: true,
    })
}

/// Remove every file named after `job`, used when the job fails so a partial
/// download is neither served nor adopted by a later job. Best effort.
pub async fn discard_partial(job: &DownloadJob) -> usize {
    let entries = match list_files(job).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(job = %job.token, error = %e, "could not scan for partial artifacts");
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.iter().filter(|e| job.carries_prefix(&e.name)) {
        delete_artifact(&job.output_dir.join(&entry.name)).await;
        removed += 1;
    }
    if removed > 0 {
        info!(job = %job.token, removed, "discarded partial artifacts of failed job");
    }
    removed
}

async fn list_files(job: &DownloadJob) -> Result<Vec<Entry>, DownloadError> {
    let io_err = |e: std::io::Error| {
        DownloadError::Internal(format!("failed to list {}: {e}", job.output_dir.display()))
    };

    let mut dir = tokio::fs::read_dir(&job.output_dir).await.map_err(io_err)?;
    let mut entries = Vec::new();
    while let Some(entry) = dir.next_entry().await.map_err(io_err)? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        // Entries can vanish between listing and stat (e.g. a janitor run).
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        // Not every filesystem records a birth time.
        let born = meta
            .created()
            .or_else(|_| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        entries.push(Entry { name, born });
    }
    Ok(entries)
}

fn age(born: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(born).unwrap_or(Duration::ZERO)
}

//! Deferred artifact deletion.
//!
//! Every published artifact gets one timer task keyed by its path. The task
//! sleeps for the configured delay, removes the file and releases the job's
//! name in the [`JobRegistry`]. Timers can be cancelled individually or all at
//! once on shutdown.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::job::JobRegistry;

#[derive(Default)]
struct Inner {
    handles: Mutex<HashMap<PathBuf, (u64, AbortHandle)>>,
    next_id: AtomicU64,
    registry: Option<Arc<JobRegistry>>,
}

impl Inner {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, (u64, AbortHandle)>> {
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Owner of all scheduled deletions.
#[derive(Clone, Default)]
pub struct Janitor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Janitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Janitor({} pending)", self.pending())
    }
}

impl Janitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A janitor that releases artifact names in `registry` after deleting.
    pub fn with_registry(registry: Arc<JobRegistry>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Some(registry),
                ..Inner::default()
            }),
        }
    }

    /// Delete `path` after `delay`. Scheduling the same path again replaces
    /// the earlier timer. Must be called from within a tokio runtime.
    pub fn schedule(&self, path: impl Into<PathBuf>, delay: Duration) {
        let path = path.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        let task_path = path.clone();

        // The map lock is held across the spawn so the task cannot finish
        // and deregister before it has been registered.
        let mut handles = self.inner.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            delete_artifact(&task_path).await;

            if let Some(registry) = &inner.registry {
                if let Some(name) = task_path.file_name().and_then(|n| n.to_str()) {
                    registry.release_filename(name);
                }
            }
            let mut handles = inner.lock();
            if handles.get(&task_path).is_some_and(|(owner, _)| *owner == id) {
                handles.remove(&task_path);
            }
        });

        if let Some((_, previous)) = handles.insert(path.clone(), (id, handle.abort_handle())) {
            previous.abort();
            debug!(path = %path.display(), "replaced pending cleanup");
        }
        debug!(path = %path.display(), delay_secs = delay.as_secs(), "cleanup scheduled");
    }

    /// Cancel the pending deletion of `path`. Returns `true` if one existed.
    pub fn cancel(&self, path: &Path) -> bool {
        match self.inner.lock().remove(path) {
            Some((_, handle)) => {
                handle.abort();
                debug!(path = %path.display(), "cleanup cancelled");
                true
            }
            None => false,
        }
    }

    /// Number of deletions still waiting to run.
    pub fn pending(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_scheduled(&self, path: &Path) -> bool {
        self.inner.lock().contains_key(path)
    }

    /// Abort every pending deletion; the files stay on disk.
    pub fn shutdown(&self) {
        let mut handles = self.inner.lock();
        let count = handles.len();
        for (_, (_, handle)) in handles.drain() {
            handle.abort();
        }
        if count > 0 {
            info!(count, "janitor stopped with pending cleanups");
        }
    }
}

/// Remove one artifact. A missing file counts as already clean; other
/// failures are logged and swallowed.
pub async fn delete_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "cleaned up artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "artifact already gone");
        }
        Err(e) => warn!(path = %path.display(), error = %e, "artifact cleanup failed"),
    }
}

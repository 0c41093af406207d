//! Safe lookup of artifact names inside the output directory.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The name escapes (or tries to escape) the base directory.
    #[error("access denied")]
    Forbidden,

    #[error("file not found")]
    NotFound,
}

/// Resolve `filename` to a regular file directly inside `base`.
///
/// Names with separators, `.`/`..` components or a root are rejected before
/// touching the filesystem. The canonical result must still live under the
/// canonical base, which also catches symlinks pointing elsewhere.
pub async fn resolve_within(base: &Path, filename: &str) -> Result<PathBuf, ResolveError> {
    if !is_plain_name(filename) {
        return Err(ResolveError::Forbidden);
    }

    let base = tokio::fs::canonicalize(base)
        .await
        .map_err(|_| ResolveError::NotFound)?;
    let resolved = tokio::fs::canonicalize(base.join(filename))
        .await
        .map_err(|_| ResolveError::NotFound)?;

    if !resolved.starts_with(&base) {
        return Err(ResolveError::Forbidden);
    }
    match tokio::fs::metadata(&resolved).await {
        Ok(meta) if meta.is_file() => Ok(resolved),
        _ => Err(ResolveError::NotFound),
    }
}

fn is_plain_name(filename: &str) -> bool {
    if filename.is_empty() || filename.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(filename).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

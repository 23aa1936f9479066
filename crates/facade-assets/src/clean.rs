//! Destination tree cleanup.

use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur while clearing the destination tree.
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Delete the entire destination tree.
///
/// Runs synchronously and must complete before any producer task writes, so
/// no stale file from a previous build survives. A missing destination is
/// not an error; a permission or lock failure is fatal.
pub fn clean_dist(dest: &Path) -> Result<(), CleanError> {
    tracing::info!("Removing old files from {}", dest.display());

    match std::fs::remove_dir_all(dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CleanError::Remove {
            path: dest.to_path_buf(),
            source,
        }),
    }
}

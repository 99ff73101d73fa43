//! Download directory management.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// Create the download directory if it does not exist.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create download directory: {}", dir.display()))?;
    debug!(dir = %dir.display(), "Download directory ready");
    Ok(())
}

/// Delete all but the `keep_recent` newest `.mp4` files in the download
/// directory. Returns the number of files deleted.
///
/// Runs on the cleanup path so an interrupted run never leaves the
/// directory growing without bound. Individual delete failures are
/// logged and skipped.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub async fn cleanup_old_files(dir: &Path, keep_recent: usize) -> Result<usize> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list download directory: {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "mp4") {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        files.push((modified, path));
    }

    // Newest first; everything past the retention window goes.
    files.sort_by(|a, b| b.0.cmp(&a.0));

    let mut deleted = 0;
    for (_, path) in files.iter().skip(keep_recent) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted old download");
                deleted += 1;
            }
            Err(e) => warn!(path = %path.display(), "Failed to delete old download: {e}"),
        }
    }

    if deleted > 0 {
        info!(deleted, keep_recent, "Download retention cleanup complete");
    }
    Ok(deleted)
}

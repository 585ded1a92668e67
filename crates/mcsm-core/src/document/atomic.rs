//! Atomic file replacement.
//!
//! 1. Write to a temp file beside the target, named per process and per write
//! 2. fsync so the data reaches disk
//! 3. Rename over the target

use crate::{McsmError, Result};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{}.{}.{}.tmp", file_name, process::id(), seq))
}

/// Replace `path` with `contents`, creating parent directories as needed.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| McsmError::io_with_path(e, parent))?;
        }
    }

    let temp_path = temp_path_for(path);
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .await
            .map_err(|e| McsmError::io_with_path(e, &temp_path))?;

        file.write_all(contents)
            .await
            .map_err(|e| McsmError::io_with_path(e, &temp_path))?;
        file.sync_all()
            .await
            .map_err(|e| McsmError::io_with_path(e, &temp_path))?;
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(McsmError::io_with_path(e, path));
    }

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

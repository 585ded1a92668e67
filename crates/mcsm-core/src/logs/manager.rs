//! Listing the log files of a server's `logs/` directory.

use super::document::LogDocument;
use crate::config::LogConfig;
use crate::{McsmError, Result};
use chrono::NaiveDate;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Hands out one shared [`LogDocument`] per log file.
///
/// The directory listing is cached after the first call; pass `refresh` to
/// pick up rotated files. Documents that survive a refresh keep their
/// identity, so running tails stay attached.
pub struct LogManager {
    directory: PathBuf,
    cache: Mutex<Option<Vec<Arc<LogDocument>>>>,
}

fn is_log_file(name: &str) -> bool {
    name.ends_with(LogConfig::LOG_EXTENSION) || name.ends_with(LogConfig::ARCHIVED_LOG_EXTENSION)
}

impl LogManager {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Every `.log` and `.log.gz` file, sorted by name.
    ///
    /// A missing directory yields an empty list.
    pub async fn list_all(&self, refresh: bool) -> Result<Vec<Arc<LogDocument>>> {
        let mut cache = self.cache.lock().await;
        if !refresh {
            if let Some(logs) = cache.as_ref() {
                return Ok(logs.clone());
            }
        }

        let mut names = Vec::new();
        match fs::read_dir(&self.directory).await {
            Ok(mut entries) => {
                while let Some(entry) = entries
                    .next_entry()
                    .await
                    .map_err(|e| McsmError::io_with_path(e, &self.directory))?
                {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if is_log_file(&name) {
                        names.push(name);
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(McsmError::io_with_path(e, &self.directory)),
        }
        names.sort();

        let previous = cache.take().unwrap_or_default();
        let logs: Vec<Arc<LogDocument>> = names
            .into_iter()
            .map(|name| {
                previous
                    .iter()
                    .find(|log| log.file_name() == name)
                    .cloned()
                    .unwrap_or_else(|| Arc::new(LogDocument::new(self.directory.join(&name))))
            })
            .collect();

        debug!("Found {} log files in {}", logs.len(), self.directory.display());
        *cache = Some(logs.clone());
        Ok(logs)
    }

    /// `latest.log`, if present.
    pub async fn get_latest(&self, refresh: bool) -> Result<Option<Arc<LogDocument>>> {
        let logs = self.list_all(refresh).await?;
        Ok(logs.into_iter().find(|log| log.is_latest()))
    }

    /// Rotated logs whose names start with `date` as `YYYY-MM-DD`.
    pub async fn get_by_date(
        &self,
        date: NaiveDate,
        refresh: bool,
    ) -> Result<Vec<Arc<LogDocument>>> {
        let prefix = date.format(LogConfig::DATE_PREFIX_FORMAT).to_string();
        let logs = self.list_all(refresh).await?;
        Ok(logs
            .into_iter()
            .filter(|log| log.file_name().starts_with(&prefix))
            .collect())
    }
}

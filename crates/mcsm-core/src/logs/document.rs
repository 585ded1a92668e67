//! Read-only log file documents.

use super::entry::{parse_log, LogEntry};
use super::tail::{LogTail, TailShared};
use crate::config::LogConfig;
use crate::document::{AcceptAll, Codec, Document};
use crate::{McsmError, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parses plain or gzip-compressed log text into entries.
///
/// Compressed logs are inflated fully into memory first.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCodec {
    compressed: bool,
}

impl LogCodec {
    pub fn new(compressed: bool) -> Self {
        Self { compressed }
    }
}

impl Codec<Vec<LogEntry>> for LogCodec {
    fn parse(&self, raw: &[u8], path: &Path) -> Result<Vec<LogEntry>> {
        if !self.compressed {
            return Ok(parse_log(&String::from_utf8_lossy(raw)));
        }

        let mut inflated = Vec::new();
        GzDecoder::new(raw)
            .read_to_end(&mut inflated)
            .map_err(|e| McsmError::Parse {
                path: path.to_path_buf(),
                message: format!("Invalid gzip data: {}", e),
            })?;
        Ok(parse_log(&String::from_utf8_lossy(&inflated)))
    }

    fn serialize(&self, _value: &Vec<LogEntry>, path: &Path) -> Result<Vec<u8>> {
        Err(McsmError::ReadOnly(path.to_path_buf()))
    }
}

/// One server log file.
pub struct LogDocument {
    document: Document<Vec<LogEntry>>,
    compressed: bool,
    tail: Arc<TailShared>,
}

impl LogDocument {
    /// Files ending in `.gz` are treated as compressed archives.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let compressed = path
            .file_name()
            .map(|n| n.to_string_lossy().ends_with(".gz"))
            .unwrap_or(false);

        Self {
            document: Document::validated(path.clone(), LogCodec::new(compressed), AcceptAll)
                .read_only(),
            compressed,
            tail: Arc::new(TailShared::new(path)),
        }
    }

    pub fn path(&self) -> &Path {
        self.document.path()
    }

    pub fn file_name(&self) -> String {
        self.document.file_name()
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn is_latest(&self) -> bool {
        self.file_name() == LogConfig::LATEST_LOG
    }

    pub async fn read(&self) -> Result<Vec<LogEntry>> {
        self.document.read().await
    }

    pub async fn reload(&self) -> Result<Vec<LogEntry>> {
        self.document.reload().await
    }

    /// The last `count` entries, oldest first.
    pub async fn read_last(&self, count: usize) -> Result<Vec<LogEntry>> {
        let mut entries = self.read().await?;
        let skip = entries.len().saturating_sub(count);
        Ok(entries.split_off(skip))
    }

    /// Follow records appended from now on.
    ///
    /// All tails on one document share a single file watch, released when
    /// the last one is dropped or unwatched.
    pub async fn tail(&self) -> Result<LogTail> {
        if self.compressed {
            return Err(McsmError::Watch {
                path: self.path().to_path_buf(),
                message: "archived logs do not grow and cannot be tailed".into(),
            });
        }
        TailShared::subscribe(&self.tail).await
    }

    /// Whether a file watch is currently running for this document.
    pub fn is_watching(&self) -> bool {
        self.tail.is_watching()
    }
}

impl std::fmt::Debug for LogDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogDocument")
            .field("path", &self.path())
            .field("compressed", &self.compressed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::Severity;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    const LOG: &str = "[10:00:00] [Server thread/INFO]: Starting\n\
                       [10:00:01] [Server thread/WARN]: Careful\n\
                       [10:00:02] [Server thread/ERROR]: Broke\n\
                       java.lang.RuntimeException\n";

    #[tokio::test]
    async fn test_read_plain_log() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("latest.log");
        std::fs::write(&path, LOG).unwrap();

        let log = LogDocument::new(&path);
        assert!(log.is_latest());
        assert!(!log.is_compressed());
        let entries = log.read().await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].severity, Some(Severity::Error));
        assert_eq!(entries[2].body, "Broke\njava.lang.RuntimeException");
    }

    #[tokio::test]
    async fn test_read_gzip_log() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("2018-09-01-1.log.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(LOG.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let log = LogDocument::new(&path);
        assert!(log.is_compressed());
        assert_eq!(log.read().await.unwrap().len(), 3);
        assert!(log.tail().await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_gzip_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.log.gz");
        std::fs::write(&path, b"not gzip").unwrap();

        let log = LogDocument::new(&path);
        assert!(matches!(log.read().await, Err(McsmError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_read_last() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("latest.log");
        std::fs::write(&path, LOG).unwrap();

        let log = LogDocument::new(&path);
        let last = log.read_last(2).await.unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].body, "Careful");
        assert_eq!(log.read_last(10).await.unwrap().len(), 3);
        assert!(log.read_last(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_log_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let log = LogDocument::new(temp_dir.path().join("latest.log"));
        assert!(log.read().await.unwrap_err().is_not_found());
    }
}

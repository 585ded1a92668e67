//! `instance.pid`: the process id of a running server.

use mcsm_core::document::{AcceptAll, Codec, Document};
use mcsm_core::{McsmError, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default)]
pub struct PidCodec;

impl Codec<Option<u32>> for PidCodec {
    fn parse(&self, raw: &[u8], path: &Path) -> Result<Option<u32>> {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        text.parse().map(Some).map_err(|e| McsmError::Parse {
            path: path.to_path_buf(),
            message: format!("invalid process id {:?}: {}", text, e),
        })
    }

    fn serialize(&self, value: &Option<u32>, _path: &Path) -> Result<Vec<u8>> {
        Ok(value.map(|pid| pid.to_string()).unwrap_or_default().into_bytes())
    }
}

/// Missing and empty files both mean "not running".
pub struct ProcessIdFile {
    document: Document<Option<u32>>,
}

impl ProcessIdFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            document: Document::validated(path, PidCodec, AcceptAll).with_fallback(|| None),
        }
    }

    pub fn path(&self) -> &Path {
        self.document.path()
    }

    pub async fn read(&self) -> Result<Option<u32>> {
        self.document.reload().await
    }

    /// Record `pid`, or delete the file for `None`.
    pub async fn write(&self, pid: Option<u32>) -> Result<()> {
        match pid {
            Some(_) => self.document.write(pid).await,
            None => self.document.delete().await,
        }
    }
}

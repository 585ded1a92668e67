//! `eula.txt`: whether the Minecraft EULA has been accepted.

use mcsm_core::config::generated_header;
use mcsm_core::document::{AcceptAll, Codec, Document};
use mcsm_core::{McsmError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

const EULA_NOTICE: &str = "By changing the setting below to TRUE you are indicating your agreement to our EULA (https://account.mojang.com/documents/minecraft_eula).";

/// Reads the `eula=` line; anything but `true` means not accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct EulaCodec;

impl Codec<bool> for EulaCodec {
    fn parse(&self, raw: &[u8], path: &Path) -> Result<bool> {
        let text = std::str::from_utf8(raw).map_err(|e| McsmError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .find(|(key, _)| key.trim() == "eula")
            .map(|(_, value)| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false))
    }

    fn serialize(&self, value: &bool, _path: &Path) -> Result<Vec<u8>> {
        Ok(format!("#{}\n#{}\neula={}\n", EULA_NOTICE, generated_header(), value).into_bytes())
    }
}

pub struct EulaFile {
    document: Document<bool>,
}

impl EulaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            document: Document::validated(path, EulaCodec, AcceptAll).with_fallback(|| false),
        }
    }

    pub fn path(&self) -> &Path {
        self.document.path()
    }

    pub async fn is_accepted(&self) -> Result<bool> {
        self.document.read().await
    }

    pub async fn reload(&self) -> Result<bool> {
        self.document.reload().await
    }

    pub async fn write(&self, accepted: bool) -> Result<()> {
        self.document.write(accepted).await
    }

    pub async fn accept(&self) -> Result<()> {
        info!("Accepting EULA at {}", self.path().display());
        self.write(true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_vanilla_eula() {
        let raw = b"#By changing the setting below to TRUE...\n#Sat Sep 01 12:00:00 UTC 2018\neula=TRUE\n";
        assert!(EulaCodec.parse(raw, Path::new("eula.txt")).unwrap());
        assert!(!EulaCodec.parse(b"eula=false\n", Path::new("eula.txt")).unwrap());
        assert!(!EulaCodec.parse(b"#eula=true\n", Path::new("eula.txt")).unwrap());
    }

    #[tokio::test]
    async fn test_missing_eula_is_not_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let eula = EulaFile::new(temp_dir.path().join("eula.txt"));
        assert!(!eula.is_accepted().await.unwrap());

        eula.accept().await.unwrap();
        assert!(eula.reload().await.unwrap());
        let raw = std::fs::read_to_string(eula.path()).unwrap();
        assert!(raw.ends_with("eula=true\n"));
    }
}

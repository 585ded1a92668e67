//! `whitelist.json`: players allowed to join when the whitelist is on.

use super::unique_player_names;
use mcsm_core::config::InstanceConfig;
use mcsm_core::document::JsonCodec;
use mcsm_core::{CollectionDocument, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub uuid: String,
    pub name: String,
}

impl WhitelistEntry {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
        }
    }

    /// Whether this entry is `uuid_or_name`; names compare case-insensitively.
    pub fn matches(&self, uuid_or_name: &str) -> bool {
        self.uuid == uuid_or_name || self.name.eq_ignore_ascii_case(uuid_or_name)
    }
}

#[allow(clippy::ptr_arg)]
fn validate_names(entries: &Vec<WhitelistEntry>) -> Result<()> {
    unique_player_names(
        InstanceConfig::WHITELIST_FILE,
        entries.iter().map(|entry| entry.name.as_str()),
    )
}

pub struct WhitelistFile {
    entries: CollectionDocument<WhitelistEntry>,
}

impl WhitelistFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            entries: CollectionDocument::with_validator(
                path,
                JsonCodec::new(),
                ["uuid", "name"],
                validate_names,
            )
            .empty_when_missing(),
        }
    }

    pub fn path(&self) -> &Path {
        self.entries.path()
    }

    pub fn entries(&self) -> &CollectionDocument<WhitelistEntry> {
        &self.entries
    }

    pub async fn read(&self) -> Result<Vec<WhitelistEntry>> {
        self.entries.read().await
    }

    pub async fn reload(&self) -> Result<Vec<WhitelistEntry>> {
        self.entries.reload().await
    }

    pub async fn add(&self, entry: WhitelistEntry) -> Result<()> {
        self.entries.add([entry]).await
    }

    /// Remove the player matching `uuid_or_name`; returns how many were removed.
    pub async fn remove(&self, uuid_or_name: &str) -> Result<usize> {
        self.entries.remove(|entry| entry.matches(uuid_or_name)).await
    }

    pub async fn is_whitelisted(&self, uuid_or_name: &str) -> Result<bool> {
        Ok(self
            .entries
            .find(|entry| entry.matches(uuid_or_name))
            .await?
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcsm_core::McsmError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_whitelist_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let whitelist = WhitelistFile::new(temp_dir.path().join("whitelist.json"));
        assert!(!whitelist.is_whitelisted("Notch").await.unwrap());

        whitelist
            .add(WhitelistEntry::new("069a79f4-44e9-4726-a5be-fca90e38aaf5", "Notch"))
            .await
            .unwrap();
        assert!(whitelist.is_whitelisted("notch").await.unwrap());
        assert!(whitelist
            .is_whitelisted("069a79f4-44e9-4726-a5be-fca90e38aaf5")
            .await
            .unwrap());

        assert_eq!(whitelist.remove("Notch").await.unwrap(), 1);
        assert!(whitelist.reload().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_player_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let whitelist = WhitelistFile::new(temp_dir.path().join("whitelist.json"));
        whitelist.add(WhitelistEntry::new("1", "a")).await.unwrap();

        let err = whitelist.add(WhitelistEntry::new("1", "b")).await.unwrap_err();
        assert!(matches!(err, McsmError::Duplicate { .. }));
        assert_eq!(whitelist.reload().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_names_differing_only_in_case_are_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let whitelist = WhitelistFile::new(temp_dir.path().join("whitelist.json"));
        whitelist.add(WhitelistEntry::new("1", "Notch")).await.unwrap();

        let err = whitelist
            .add(WhitelistEntry::new("2", "notch"))
            .await
            .unwrap_err();
        match err {
            McsmError::Duplicate { key, value, .. } => {
                assert_eq!(key, "name");
                assert_eq!(value, "notch");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(whitelist.remove("NOTCH").await.unwrap(), 1);
        assert!(whitelist.reload().await.unwrap().is_empty());
    }
}

//! `ops.json`: server operators and their permission levels.

use super::unique_player_names;
use mcsm_core::config::InstanceConfig;
use mcsm_core::document::JsonCodec;
use mcsm_core::{CollectionDocument, McsmError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MIN_OP_LEVEL: u8 = 1;
pub const MAX_OP_LEVEL: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpEntry {
    pub uuid: String,
    pub name: String,
    pub level: u8,
    #[serde(default)]
    pub bypasses_player_limit: bool,
}

impl OpEntry {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>, level: u8) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            level,
            bypasses_player_limit: false,
        }
    }
}

#[allow(clippy::ptr_arg)]
fn validate_ops(ops: &Vec<OpEntry>) -> Result<()> {
    unique_player_names(
        InstanceConfig::OPS_FILE,
        ops.iter().map(|op| op.name.as_str()),
    )?;
    match ops
        .iter()
        .find(|op| !(MIN_OP_LEVEL..=MAX_OP_LEVEL).contains(&op.level))
    {
        Some(op) => Err(McsmError::validation(
            "level",
            format!(
                "operator {} has level {}, expected {}-{}",
                op.name, op.level, MIN_OP_LEVEL, MAX_OP_LEVEL
            ),
        )),
        None => Ok(()),
    }
}

pub struct OpsFile {
    entries: CollectionDocument<OpEntry>,
}

impl OpsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            entries: CollectionDocument::with_validator(
                path,
                JsonCodec::new(),
                ["uuid", "name"],
                validate_ops,
            )
            .empty_when_missing(),
        }
    }

    pub fn path(&self) -> &Path {
        self.entries.path()
    }

    pub fn entries(&self) -> &CollectionDocument<OpEntry> {
        &self.entries
    }

    pub async fn read(&self) -> Result<Vec<OpEntry>> {
        self.entries.read().await
    }

    pub async fn reload(&self) -> Result<Vec<OpEntry>> {
        self.entries.reload().await
    }

    pub async fn find_by_uuid(&self, uuid: &str) -> Result<Option<OpEntry>> {
        self.entries.find(|op| op.uuid == uuid).await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<OpEntry>> {
        self.entries.find(|op| op.name.eq_ignore_ascii_case(name)).await
    }

    pub async fn add(&self, op: OpEntry) -> Result<()> {
        self.entries.add([op]).await
    }

    pub async fn remove(&self, uuid: &str) -> Result<usize> {
        self.entries.remove(|op| op.uuid == uuid).await
    }

    /// Change an operator's level; returns whether the operator exists.
    pub async fn set_level(&self, uuid: &str, level: u8) -> Result<bool> {
        let updated = self
            .entries
            .update_item(|op| op.uuid == uuid, |op| OpEntry { level, ..op })
            .await?;
        Ok(updated > 0)
    }
}

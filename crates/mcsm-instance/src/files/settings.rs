//! `instance.json`: the instance's own settings.

use mcsm_core::config::InstanceConfig;
use mcsm_core::document::{Document, JsonCodec};
use mcsm_core::{McsmError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings of one server instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft_version: Option<String>,
    /// Server jar file name, relative to the instance directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_jar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_bin: Option<String>,
}

impl Settings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            minecraft_version: None,
            server_jar: None,
            java_args: None,
            java_bin: None,
        }
    }

    /// Apply every field set in `patch`.
    pub fn apply(mut self, patch: SettingsPatch) -> Self {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(version) = patch.minecraft_version {
            self.minecraft_version = Some(version);
        }
        if let Some(jar) = patch.server_jar {
            self.server_jar = Some(jar);
        }
        if let Some(args) = patch.java_args {
            self.java_args = Some(args);
        }
        if let Some(bin) = patch.java_bin {
            self.java_bin = Some(bin);
        }
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(InstanceConfig::DEFAULT_NAME)
    }
}

/// A partial update to [`Settings`]; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub name: Option<String>,
    pub minecraft_version: Option<String>,
    pub server_jar: Option<String>,
    pub java_args: Option<Vec<String>>,
    pub java_bin: Option<String>,
}

impl SettingsPatch {
    /// The patch the installer writes once a server jar is in place.
    pub fn installed(version_id: impl Into<String>, server_jar: impl Into<String>) -> Self {
        Self {
            minecraft_version: Some(version_id.into()),
            server_jar: Some(server_jar.into()),
            ..Self::default()
        }
    }
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.name.trim().is_empty() {
        return Err(McsmError::validation("name", "an instance must have a name"));
    }
    if settings.server_jar.is_some() && settings.minecraft_version.is_none() {
        return Err(McsmError::validation(
            "minecraftVersion",
            "a server jar requires a Minecraft version",
        ));
    }
    if let Some(version) = &settings.minecraft_version {
        if version.trim().is_empty() {
            return Err(McsmError::validation("minecraftVersion", "must not be empty"));
        }
    }
    if let Some(args) = &settings.java_args {
        if args.iter().any(|arg| arg.trim().is_empty()) {
            return Err(McsmError::validation(
                "javaArgs",
                "every Java argument must be a non-empty string",
            ));
        }
    }
    Ok(())
}

/// The settings document. A missing file reads as an unnamed instance.
pub struct SettingsFile {
    document: Document<Settings>,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            document: Document::validated(path, JsonCodec::new(), validate_settings)
                .with_fallback(Settings::default),
        }
    }

    pub fn path(&self) -> &Path {
        self.document.path()
    }

    pub async fn exists(&self) -> bool {
        self.document.exists().await
    }

    pub async fn read(&self) -> Result<Settings> {
        self.document.read().await
    }

    pub async fn reload(&self) -> Result<Settings> {
        self.document.reload().await
    }

    pub async fn write(&self, settings: Settings) -> Result<()> {
        self.document.write(settings).await
    }

    /// Read-modify-write merge; returns the settings as written.
    pub async fn patch(&self, patch: SettingsPatch) -> Result<Settings> {
        let updated = self.read().await?.apply(patch);
        self.write(updated.clone()).await?;
        debug!("Patched settings at {}", self.path().display());
        Ok(updated)
    }
}

//! A server instance: one directory and the files inside it.

use crate::files::{
    EulaFile, OpsFile, ProcessIdFile, ServerProperties, ServerPropertiesFile, Settings,
    SettingsFile, UserCacheFile, WhitelistFile,
};
use crate::mods::ModManager;
use mcsm_core::config::{AppConfig, InstanceConfig};
use mcsm_core::{LogManager, McsmError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::info;

/// Default parent directory of all instances.
///
/// Uses the platform data directory, e.g. `~/.local/share/mcsm/instances`.
pub fn default_instances_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| {
        dir.join(AppConfig::APP_NAME)
            .join(InstanceConfig::INSTANCES_DIR_NAME)
    })
}

/// One server instance.
///
/// Holds exactly one handle per file, so everything sharing an `Instance`
/// (usually behind an `Arc`) sees one cache per file.
pub struct Instance {
    directory: PathBuf,
    settings: Arc<SettingsFile>,
    properties: Arc<ServerPropertiesFile>,
    eula: Arc<EulaFile>,
    process_id: Arc<ProcessIdFile>,
    whitelist: Arc<WhitelistFile>,
    ops: Arc<OpsFile>,
    user_cache: Arc<UserCacheFile>,
    logs: Arc<LogManager>,
    mods: Arc<ModManager>,
}

impl Instance {
    /// Bind to `directory`. Nothing is read or created.
    pub fn open(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let file = |name: &str| directory.join(name);

        Self {
            settings: Arc::new(SettingsFile::new(file(InstanceConfig::SETTINGS_FILE))),
            properties: Arc::new(ServerPropertiesFile::new(file(InstanceConfig::PROPERTIES_FILE))),
            eula: Arc::new(EulaFile::new(file(InstanceConfig::EULA_FILE))),
            process_id: Arc::new(ProcessIdFile::new(file(InstanceConfig::PID_FILE))),
            whitelist: Arc::new(WhitelistFile::new(file(InstanceConfig::WHITELIST_FILE))),
            ops: Arc::new(OpsFile::new(file(InstanceConfig::OPS_FILE))),
            user_cache: Arc::new(UserCacheFile::new(file(InstanceConfig::USER_CACHE_FILE))),
            logs: Arc::new(LogManager::new(file(InstanceConfig::LOGS_DIR_NAME))),
            mods: Arc::new(ModManager::new(
                file(InstanceConfig::MODS_DIR_NAME),
                file(InstanceConfig::MOD_MANIFEST_FILE),
            )),
            directory,
        }
    }

    /// Create `directory` and write the initial settings (and properties,
    /// when given).
    pub async fn create(
        directory: impl Into<PathBuf>,
        settings: Settings,
        properties: Option<ServerProperties>,
    ) -> Result<Self> {
        let instance = Self::open(directory);
        fs::create_dir_all(&instance.directory)
            .await
            .map_err(|e| McsmError::io_with_path(e, &instance.directory))?;

        let name = settings.name.clone();
        instance.settings.write(settings).await?;
        if let Some(properties) = properties {
            instance.properties.write(properties).await?;
        }
        info!("Created instance \"{}\" at {}", name, instance.directory.display());
        Ok(instance)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// A path inside the instance directory.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.directory.join(relative)
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.directory).await.unwrap_or(false)
    }

    pub fn settings(&self) -> &Arc<SettingsFile> {
        &self.settings
    }

    pub fn properties(&self) -> &Arc<ServerPropertiesFile> {
        &self.properties
    }

    pub fn eula(&self) -> &Arc<EulaFile> {
        &self.eula
    }

    pub fn process_id(&self) -> &Arc<ProcessIdFile> {
        &self.process_id
    }

    pub fn whitelist(&self) -> &Arc<WhitelistFile> {
        &self.whitelist
    }

    pub fn ops(&self) -> &Arc<OpsFile> {
        &self.ops
    }

    pub fn user_cache(&self) -> &Arc<UserCacheFile> {
        &self.user_cache
    }

    pub fn logs(&self) -> &Arc<LogManager> {
        &self.logs
    }

    pub fn mods(&self) -> &Arc<ModManager> {
        &self.mods
    }

    /// The configured server jar, if settings name one.
    pub async fn server_jar_path(&self) -> Result<Option<PathBuf>> {
        Ok(self
            .settings
            .read()
            .await?
            .server_jar
            .map(|jar| self.path(jar)))
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

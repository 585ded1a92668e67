//! Centralized configuration for mcsm.
//!
//! Constants for network operations, remote catalogs, instance file layout
//! and log handling.

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "mcsm";
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const USER_AGENT: &'static str = concat!("mcsm/", env!("CARGO_PKG_VERSION"));
    /// Minimum elapsed time between two transfer progress events.
    pub const TRANSFER_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);
    /// Weight of the newest sample in the exponentially smoothed speed.
    pub const SPEED_SMOOTHING: f64 = 0.3;
}

/// Remote release catalogs.
pub struct CatalogConfig;

impl CatalogConfig {
    pub const VERSION_MANIFEST_URL: &'static str =
        "https://launchermeta.mojang.com/mc/game/version_manifest.json";
    pub const LOADER_MANIFEST_URL: &'static str =
        "https://files.minecraftforge.net/maven/net/minecraftforge/forge/json";
}

/// File names and defaults inside an instance directory.
pub struct InstanceConfig;

impl InstanceConfig {
    pub const SETTINGS_FILE: &'static str = "instance.json";
    pub const PROPERTIES_FILE: &'static str = "server.properties";
    pub const EULA_FILE: &'static str = "eula.txt";
    pub const PID_FILE: &'static str = "instance.pid";
    pub const WHITELIST_FILE: &'static str = "whitelist.json";
    pub const OPS_FILE: &'static str = "ops.json";
    pub const USER_CACHE_FILE: &'static str = "usercache.json";
    pub const MOD_MANIFEST_FILE: &'static str = "mods.json";
    pub const MODS_DIR_NAME: &'static str = "mods";
    pub const LOGS_DIR_NAME: &'static str = "logs";
    pub const DEFAULT_NAME: &'static str = "Unnamed Instance";
    pub const INSTANCES_DIR_NAME: &'static str = "instances";
}

/// Log file handling.
pub struct LogConfig;

impl LogConfig {
    pub const LATEST_LOG: &'static str = "latest.log";
    pub const LOG_EXTENSION: &'static str = ".log";
    pub const ARCHIVED_LOG_EXTENSION: &'static str = ".log.gz";
    /// Fallback poll for filesystems that do not deliver change events.
    pub const TAIL_POLL_INTERVAL: Duration = Duration::from_millis(250);
    pub const DATE_PREFIX_FORMAT: &'static str = "%Y-%m-%d";
}

/// Header line written at the top of generated text files.
pub fn generated_header() -> String {
    format!(
        "Generated by {} v{} at {}",
        AppConfig::APP_NAME,
        AppConfig::VERSION,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

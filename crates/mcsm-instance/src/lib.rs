//! mcsm instance - Minecraft server instances and their installation.
//!
//! This crate builds on `mcsm-core` documents and remote resources to model
//! one server directory: its configuration files, the release catalogs the
//! server jar comes from, the installer and installed mods.
//!
//! # Modules
//!
//! - `instance` - One server directory and a handle per file inside it
//! - `files` - Settings, server properties, EULA, pid, whitelist, ops and user cache
//! - `catalog` - Vanilla release and mod loader catalogs
//! - `installer` - Install the server jar with observable state
//! - `mods` - Install, list and remove mods

pub mod catalog;
pub mod files;
pub mod installer;
pub mod instance;
pub mod mods;

// Re-export commonly used types
pub use catalog::{LoaderCatalog, MojangCatalog, Promotion, ReleaseCatalog, VersionList};
pub use files::{PropertyValue, ServerProperties, Settings, SettingsPatch};
pub use installer::{InstallState, InstallSubscription, Installer};
pub use instance::{default_instances_dir, Instance};
pub use mods::{ModInstance, ModManager, ModSource};

// Re-export core types commonly needed alongside instances
pub use mcsm_core::error::{McsmError, Result};
pub use mcsm_core::TransferProgress;

//! mcsm core - persistent documents, remote resources and log handling for
//! Minecraft server management.
//!
//! This crate provides the building blocks every server instance is made
//! of. For the concrete instance files, release catalogs, the installer and
//! mods, see the `mcsm-instance` crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use mcsm_core::{CollectionDocument, Result};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct Player {
//!     uuid: String,
//!     name: String,
//! }
//!
//! async fn whitelist_notch(dir: &std::path::Path) -> Result<()> {
//!     let whitelist: CollectionDocument<Player> =
//!         CollectionDocument::json(dir.join("whitelist.json"), ["uuid", "name"])
//!             .empty_when_missing();
//!
//!     whitelist
//!         .add([Player { uuid: "069a79f4".into(), name: "Notch".into() }])
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod logs;
pub mod network;

// Re-export commonly used types
pub use document::{CollectionDocument, Document};
pub use error::{McsmError, Result};
pub use logs::{LogDocument, LogEntry, LogManager, LogTail, Severity};
pub use network::{
    transfer, HttpClient, RemoteMetadata, RemoteResource, TransferOptions, TransferProgress,
    Transferred,
};

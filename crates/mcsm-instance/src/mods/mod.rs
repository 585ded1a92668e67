//! Mods installed into an instance's `mods/` directory.

mod manager;
mod manifest;
mod metadata;

pub use manager::{ModInstance, ModManager};
pub use manifest::{ModManifestEntry, ModSource};
pub use metadata::{ModInfoCodec, ModMetadata, ModMetadataFile, MOD_INFO_ENTRY};

//! The files a Minecraft server keeps in its instance directory.

mod eula;
mod ops;
mod pid;
mod properties;
mod settings;
mod user_cache;
mod whitelist;

pub use eula::{EulaCodec, EulaFile};
pub use ops::{OpEntry, OpsFile, MAX_OP_LEVEL, MIN_OP_LEVEL};
pub use pid::{PidCodec, ProcessIdFile};
pub use properties::{PropertiesCodec, PropertyValue, ServerProperties, ServerPropertiesFile};
pub use settings::{Settings, SettingsFile, SettingsPatch};
pub use user_cache::{CachedUser, UserCacheFile};
pub use whitelist::{WhitelistEntry, WhitelistFile};

use mcsm_core::{McsmError, Result};
use std::collections::HashSet;

/// Player names compare case-insensitively, so two entries may not differ
/// only in case.
pub(crate) fn unique_player_names<'a>(
    collection: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(McsmError::Duplicate {
                collection: collection.to_string(),
                key: "name".to_string(),
                value: name.to_string(),
            });
        }
    }
    Ok(())
}

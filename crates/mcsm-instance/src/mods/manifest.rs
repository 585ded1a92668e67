//! `mods.json`: which mods an instance has and where they came from.

use super::metadata::ModMetadata;
use serde::{Deserialize, Serialize};

/// Where a mod jar was installed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModSource {
    Local,
    Remote {
        url: String,
    },
    Forge {
        #[serde(rename = "projectId")]
        project_id: u64,
        #[serde(rename = "fileId")]
        file_id: u64,
    },
}

/// One entry of the mod manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModManifestEntry {
    /// Jar file name inside the `mods/` directory.
    pub path: String,
    pub from: ModSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ModMetadata>,
}

impl ModManifestEntry {
    pub fn new(path: impl Into<String>, from: ModSource) -> Self {
        Self {
            path: path.into(),
            from,
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_wire_format() {
        let entry = ModManifestEntry::new(
            "jei.jar",
            ModSource::Forge {
                project_id: 238222,
                file_id: 2_803_400,
            },
        );
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({ "path": "jei.jar", "from": { "type": "forge", "projectId": 238222, "fileId": 2803400 } })
        );

        let local: ModManifestEntry =
            serde_json::from_value(json!({ "path": "a.jar", "from": { "type": "local" } })).unwrap();
        assert_eq!(local.from, ModSource::Local);
    }
}

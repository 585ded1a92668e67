//! `mcmod.info` metadata read from inside a mod jar.

use mcsm_core::document::{AcceptAll, Codec, Document};
use mcsm_core::{McsmError, Result};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

/// Name of the metadata entry inside a mod jar.
pub const MOD_INFO_ENTRY: &str = "mcmod.info";

/// Metadata a mod declares about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModMetadata {
    #[serde(alias = "modid")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    #[serde(alias = "mcversion")]
    pub mc_version: String,
    pub url: String,
    pub update_url: String,
    pub author_list: Vec<String>,
    pub logo_file: String,
    pub screenshots: Vec<String>,
    pub dependencies: Vec<String>,
}

/// Both layouts of `mcmod.info`: a bare list, or the versioned object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ModInfo {
    List(Vec<ModMetadata>),
    Versioned {
        #[serde(rename = "modList")]
        mod_list: Vec<ModMetadata>,
    },
}

/// Reads one JSON entry out of a zip archive. Writing is not supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModInfoCodec;

impl Codec<Option<ModMetadata>> for ModInfoCodec {
    fn parse(&self, raw: &[u8], path: &Path) -> Result<Option<ModMetadata>> {
        let parse_error = |message: String| McsmError::Parse {
            path: path.join(MOD_INFO_ENTRY),
            message,
        };

        let mut archive = zip::ZipArchive::new(Cursor::new(raw)).map_err(|e| McsmError::Parse {
            path: path.to_path_buf(),
            message: format!("not a zip archive: {}", e),
        })?;
        let mut entry = match archive.by_name(MOD_INFO_ENTRY) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(parse_error(e.to_string())),
        };

        let mut contents = String::new();
        entry
            .read_to_string(&mut contents)
            .map_err(|e| parse_error(e.to_string()))?;

        let info: ModInfo =
            serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string()))?;
        let mods = match info {
            ModInfo::List(mods) => mods,
            ModInfo::Versioned { mod_list } => mod_list,
        };
        Ok(mods.into_iter().next())
    }

    fn serialize(&self, _value: &Option<ModMetadata>, path: &Path) -> Result<Vec<u8>> {
        Err(McsmError::ReadOnly(path.to_path_buf()))
    }
}

/// Read-only view of a jar's metadata. A jar without `mcmod.info` has none.
pub struct ModMetadataFile {
    document: Document<Option<ModMetadata>>,
}

impl ModMetadataFile {
    pub fn new(jar_path: impl Into<PathBuf>) -> Self {
        Self {
            document: Document::validated(jar_path, ModInfoCodec, AcceptAll).read_only(),
        }
    }

    pub fn path(&self) -> &Path {
        self.document.path()
    }

    pub async fn read(&self) -> Result<Option<ModMetadata>> {
        self.document.read().await
    }
}

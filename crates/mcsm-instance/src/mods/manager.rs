//! Installing, listing and removing mods of an instance.

use super::manifest::{ModManifestEntry, ModSource};
use super::metadata::ModMetadataFile;
use mcsm_core::network::{transfer, TransferOptions, TransferProgress};
use mcsm_core::{CollectionDocument, McsmError, RemoteResource, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// A mod jar in an instance's `mods/` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModInstance {
    mods_dir: PathBuf,
    entry: ModManifestEntry,
}

impl ModInstance {
    pub fn new(mods_dir: impl Into<PathBuf>, entry: ModManifestEntry) -> Self {
        Self {
            mods_dir: mods_dir.into(),
            entry,
        }
    }

    pub fn entry(&self) -> &ModManifestEntry {
        &self.entry
    }

    pub fn path(&self) -> PathBuf {
        self.mods_dir.join(&self.entry.path)
    }

    pub fn metadata_file(&self) -> ModMetadataFile {
        ModMetadataFile::new(self.path())
    }

    pub async fn is_installed(&self) -> bool {
        fs::try_exists(self.path()).await.unwrap_or(false)
    }

    /// Delete the jar. The manifest is left alone.
    pub async fn remove(&self) -> Result<()> {
        let path = self.path();
        fs::remove_file(&path)
            .await
            .map_err(|e| McsmError::io_with_path(e, &path))?;
        debug!("Removed mod jar {}", path.display());
        Ok(())
    }

    /// Adopt a jar already on disk, copying it into `mods_dir` when it lives
    /// elsewhere. The source defaults to [`ModSource::Local`].
    pub async fn from_local_file(
        mods_dir: &Path,
        source: &Path,
        from: Option<ModSource>,
    ) -> Result<Self> {
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                McsmError::validation("path", format!("{} has no file name", source.display()))
            })?;

        let target = mods_dir.join(&file_name);
        if target != source {
            fs::create_dir_all(mods_dir)
                .await
                .map_err(|e| McsmError::io_with_path(e, mods_dir))?;
            fs::copy(source, &target)
                .await
                .map_err(|e| McsmError::io_with_path(e, source))?;
            info!("Copied mod {} into {}", file_name, mods_dir.display());
        }

        Ok(Self::new(
            mods_dir,
            ModManifestEntry::new(file_name, from.unwrap_or(ModSource::Local)),
        ))
    }

    /// Download a jar into `mods_dir`. The source defaults to
    /// [`ModSource::Remote`] with the resource's URL.
    pub async fn from_remote<T>(
        mods_dir: &Path,
        remote: &RemoteResource<T>,
        from: Option<ModSource>,
        on_progress: Option<UnboundedSender<TransferProgress>>,
    ) -> Result<Self>
    where
        T: Clone + Send + Sync + 'static,
    {
        let transferred =
            transfer(remote, mods_dir, TransferOptions::default(), on_progress).await?;
        let from = from.unwrap_or_else(|| ModSource::Remote {
            url: remote.url().to_string(),
        });
        Self::from_local_file(mods_dir, transferred.path(), Some(from)).await
    }
}

/// The mod manifest of one instance plus the jars it names.
pub struct ModManager {
    mods_dir: PathBuf,
    manifest: CollectionDocument<ModManifestEntry>,
}

impl ModManager {
    pub fn new(mods_dir: impl Into<PathBuf>, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            mods_dir: mods_dir.into(),
            manifest: CollectionDocument::json(manifest_path, ["path"]).empty_when_missing(),
        }
    }

    pub fn mods_dir(&self) -> &Path {
        &self.mods_dir
    }

    pub fn manifest(&self) -> &CollectionDocument<ModManifestEntry> {
        &self.manifest
    }

    pub async fn list_mods(&self) -> Result<Vec<ModInstance>> {
        Ok(self
            .manifest
            .read()
            .await?
            .into_iter()
            .map(|entry| ModInstance::new(&self.mods_dir, entry))
            .collect())
    }

    /// Record an installed mod, with the metadata from its jar.
    pub async fn add_mod(&self, instance: &ModInstance) -> Result<()> {
        if !instance.is_installed().await {
            return Err(McsmError::ModNotInstalled {
                path: instance.path(),
            });
        }
        let metadata = instance.metadata_file().read().await?;
        let entry = ModManifestEntry {
            metadata,
            ..instance.entry.clone()
        };
        self.manifest.add([entry]).await?;
        info!("Added mod {}", instance.entry.path);
        Ok(())
    }

    /// Delete the jar if present and drop the manifest entry.
    pub async fn remove_mod(&self, instance: &ModInstance) -> Result<()> {
        if instance.is_installed().await {
            instance.remove().await?;
        }
        let path = &instance.entry.path;
        self.manifest.remove(|entry| &entry.path == path).await?;
        info!("Removed mod {}", path);
        Ok(())
    }

    /// Whether every manifest entry has its jar on disk.
    pub async fn all_installed(&self) -> Result<bool> {
        for instance in self.list_mods().await? {
            if !instance.is_installed().await {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

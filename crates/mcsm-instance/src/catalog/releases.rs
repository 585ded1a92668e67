//! Vanilla release catalog: the launcher version manifest and per-release
//! manifests that point at server jars.

use async_trait::async_trait;
use mcsm_core::config::CatalogConfig;
use mcsm_core::{HttpClient, McsmError, RemoteResource, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseKind {
    Release,
    Snapshot,
    OldBeta,
    OldAlpha,
    #[serde(other)]
    Unknown,
}

/// One entry of the version manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ReleaseKind,
    /// URL of the release manifest.
    pub url: String,
    pub time: String,
    pub release_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestVersions {
    pub release: Option<String>,
    pub snapshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionManifest {
    #[serde(default)]
    pub latest: LatestVersions,
    pub versions: Vec<VersionSummary>,
}

/// A downloadable artifact of a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDownloads {
    pub client: Option<Download>,
    pub server: Option<Download>,
}

/// The per-release manifest. Only the fields the installer needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseManifest {
    pub id: String,
    #[serde(default)]
    pub downloads: ReleaseDownloads,
}

/// The version manifest, fetched once per instance of this type.
pub struct VersionList {
    resource: RemoteResource<VersionManifest>,
}

impl VersionList {
    pub fn new(client: HttpClient) -> Self {
        Self::with_url(client, CatalogConfig::VERSION_MANIFEST_URL)
    }

    pub fn with_url(client: HttpClient, url: impl Into<String>) -> Self {
        Self {
            resource: RemoteResource::json(client, url),
        }
    }

    pub fn resource(&self) -> &RemoteResource<VersionManifest> {
        &self.resource
    }

    pub async fn manifest(&self) -> Result<VersionManifest> {
        self.resource.read().await
    }

    /// Full releases only, newest first as listed.
    pub async fn releases(&self) -> Result<Vec<VersionSummary>> {
        Ok(self
            .manifest()
            .await?
            .versions
            .into_iter()
            .filter(|v| v.kind == ReleaseKind::Release)
            .collect())
    }

    pub async fn find_by_id(&self, version_id: &str) -> Result<Option<VersionSummary>> {
        Ok(self
            .manifest()
            .await?
            .versions
            .into_iter()
            .find(|v| v.id == version_id))
    }

    /// The newest version of `kind`, as named by the manifest's `latest`
    /// block where it has one.
    pub async fn latest(&self, kind: ReleaseKind) -> Result<Option<VersionSummary>> {
        let manifest = self.manifest().await?;
        let named = match kind {
            ReleaseKind::Release => manifest.latest.release.clone(),
            ReleaseKind::Snapshot => manifest.latest.snapshot.clone(),
            _ => None,
        };
        let mut versions = manifest.versions.into_iter();
        Ok(match named {
            Some(id) => versions.find(|v| v.id == id),
            None => versions.find(|v| v.kind == kind),
        })
    }
}

/// Where the installer gets server jars from.
#[async_trait]
pub trait ReleaseCatalog: Send + Sync {
    /// The server artifact of `version_id`.
    async fn server_download(&self, version_id: &str) -> Result<Download>;
}

/// The vanilla launcher catalog.
pub struct MojangCatalog {
    client: HttpClient,
    versions: VersionList,
}

impl MojangCatalog {
    pub fn new(client: HttpClient) -> Self {
        let versions = VersionList::new(client.clone());
        Self { client, versions }
    }

    /// A catalog reading the version manifest from `manifest_url`.
    pub fn with_manifest_url(client: HttpClient, manifest_url: impl Into<String>) -> Self {
        let versions = VersionList::with_url(client.clone(), manifest_url);
        Self { client, versions }
    }

    pub fn versions(&self) -> &VersionList {
        &self.versions
    }

    pub async fn release_manifest(&self, version_id: &str) -> Result<ReleaseManifest> {
        let summary = self
            .versions
            .find_by_id(version_id)
            .await?
            .ok_or_else(|| McsmError::VersionNotFound {
                version_id: version_id.to_string(),
            })?;
        debug!("Fetching release manifest for {} from {}", version_id, summary.url);
        RemoteResource::<ReleaseManifest>::json(self.client.clone(), summary.url)
            .read()
            .await
    }
}

#[async_trait]
impl ReleaseCatalog for MojangCatalog {
    async fn server_download(&self, version_id: &str) -> Result<Download> {
        self.release_manifest(version_id)
            .await?
            .downloads
            .server
            .ok_or_else(|| McsmError::NoServerDownload {
                version_id: version_id.to_string(),
            })
    }
}

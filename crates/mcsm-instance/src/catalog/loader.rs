//! Mod loader (Forge) release catalog.

use chrono::{DateTime, Utc};
use mcsm_core::config::CatalogConfig;
use mcsm_core::{HttpClient, RemoteResource, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Build as listed in the loader manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLoaderBuild {
    pub build: u64,
    pub version: String,
    #[serde(default)]
    pub branch: Option<String>,
    /// Seconds since the epoch.
    #[serde(default)]
    pub modified: Option<f64>,
    pub mcversion: String,
    /// `[extension, classifier, sha1]` triples.
    #[serde(default)]
    pub files: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderManifest {
    pub homepage: String,
    pub name: String,
    #[serde(default)]
    pub number: HashMap<String, RawLoaderBuild>,
    #[serde(default)]
    pub promos: HashMap<String, u64>,
    #[serde(default)]
    pub mcversion: HashMap<String, Vec<u64>>,
    #[serde(default)]
    pub branches: HashMap<String, Vec<u64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderFile {
    pub extension: String,
    pub classifier: String,
    pub sha1: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderRelease {
    pub build: u64,
    pub version: String,
    pub branch: Option<String>,
    pub minecraft_version: String,
    pub released_at: Option<DateTime<Utc>>,
    /// Files keyed by classifier (`installer`, `universal`, ...).
    pub files: BTreeMap<String, LoaderFile>,
}

impl LoaderRelease {
    pub fn installer(&self) -> Option<&LoaderFile> {
        self.files.get("installer")
    }
}

/// Promotion channels of the loader manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Promotion {
    #[default]
    Recommended,
    Latest,
}

impl fmt::Display for Promotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recommended => f.write_str("recommended"),
            Self::Latest => f.write_str("latest"),
        }
    }
}

impl LoaderManifest {
    /// Resolve a raw build into a release with download URLs.
    ///
    /// Artifacts live at
    /// `{homepage}/{mc}-{version}[-{branch}]/{name}-{mc}-{version}[-{branch}]-{classifier}.{ext}`.
    pub fn resolve(&self, raw: &RawLoaderBuild) -> LoaderRelease {
        let homepage = self.homepage.trim_end_matches('/');
        let mut full_version = format!("{}-{}", raw.mcversion, raw.version);
        if let Some(branch) = &raw.branch {
            full_version.push('-');
            full_version.push_str(branch);
        }

        let files = raw
            .files
            .iter()
            .filter_map(|file| match file.as_slice() {
                [extension, classifier, rest @ ..] => Some(LoaderFile {
                    url: format!(
                        "{}/{}/{}-{}-{}.{}",
                        homepage, full_version, self.name, full_version, classifier, extension
                    ),
                    extension: extension.clone(),
                    classifier: classifier.clone(),
                    sha1: rest.first().cloned(),
                }),
                _ => None,
            })
            .map(|file| (file.classifier.clone(), file))
            .collect();

        LoaderRelease {
            build: raw.build,
            version: raw.version.clone(),
            branch: raw.branch.clone(),
            minecraft_version: raw.mcversion.clone(),
            released_at: raw
                .modified
                .and_then(|secs| DateTime::from_timestamp(secs as i64, 0)),
            files,
        }
    }

    pub fn release_by_build(&self, build: u64) -> Option<LoaderRelease> {
        self.number.get(&build.to_string()).map(|raw| self.resolve(raw))
    }
}

pub struct LoaderCatalog {
    resource: RemoteResource<LoaderManifest>,
}

impl LoaderCatalog {
    pub fn new(client: HttpClient) -> Self {
        Self::with_url(client, CatalogConfig::LOADER_MANIFEST_URL)
    }

    pub fn with_url(client: HttpClient, url: impl Into<String>) -> Self {
        Self {
            resource: RemoteResource::json(client, url),
        }
    }

    pub async fn manifest(&self) -> Result<LoaderManifest> {
        self.resource.read().await
    }

    pub async fn release_by_build(&self, build: u64) -> Result<Option<LoaderRelease>> {
        Ok(self.manifest().await?.release_by_build(build))
    }

    /// Every build for `minecraft_version`; empty when the version is unknown.
    pub async fn releases_for_version(
        &self,
        minecraft_version: &str,
    ) -> Result<Vec<LoaderRelease>> {
        let manifest = self.manifest().await?;
        Ok(manifest
            .mcversion
            .get(minecraft_version)
            .map(|builds| {
                builds
                    .iter()
                    .filter_map(|build| manifest.release_by_build(*build))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn promoted(
        &self,
        minecraft_version: &str,
        promotion: Promotion,
    ) -> Result<Option<LoaderRelease>> {
        let manifest = self.manifest().await?;
        Ok(manifest
            .promos
            .get(&format!("{}-{}", minecraft_version, promotion))
            .and_then(|build| manifest.release_by_build(*build)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SHA: &str = "0000000000000000000000000000000000000000";

    async fn catalog() -> (MockServer, LoaderCatalog) {
        let server = MockServer::start().await;
        let manifest = json!({
            "homepage": "https://files.minecraftforge.net/test/",
            "name": "forge",
            "mcversion": { "1.10.2": [1], "1.12.2": [2, 3] },
            "number": {
                "1": { "build": 1, "version": "12.18.3.2511", "branch": null,
                       "modified": 1514764800.0, "mcversion": "1.10.2", "files": [] },
                "2": { "build": 2, "version": "14.23.4.2705", "branch": null,
                       "modified": 1483401600.0, "mcversion": "1.12.2",
                       "files": [["jar", "installer", SHA], ["txt", "changelog", SHA]] },
                "3": { "build": 3, "version": "14.23.4.2759", "branch": "1.12.2",
                       "modified": 1483401600.0, "mcversion": "1.12.2",
                       "files": [["jar", "installer", SHA]] }
            },
            "promos": { "1.12.2-recommended": 2, "1.12.2-latest": 3 }
        });
        Mock::given(method("GET"))
            .and(path("/forge/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(manifest))
            .expect(1)
            .mount(&server)
            .await;
        let catalog = LoaderCatalog::with_url(
            HttpClient::new().unwrap(),
            format!("{}/forge/json", server.uri()),
        );
        (server, catalog)
    }

    #[tokio::test]
    async fn test_release_urls() {
        let (_server, catalog) = catalog().await;
        let release = catalog.release_by_build(2).await.unwrap().unwrap();
        assert_eq!(release.minecraft_version, "1.12.2");
        assert_eq!(
            release.installer().unwrap().url,
            "https://files.minecraftforge.net/test/1.12.2-14.23.4.2705/forge-1.12.2-14.23.4.2705-installer.jar"
        );
        assert_eq!(release.files["changelog"].sha1.as_deref(), Some(SHA));
        assert!(release.released_at.is_some());

        let branched = catalog.release_by_build(3).await.unwrap().unwrap();
        assert!(branched
            .installer()
            .unwrap()
            .url
            .ends_with("/1.12.2-14.23.4.2759-1.12.2/forge-1.12.2-14.23.4.2759-1.12.2-installer.jar"));
    }

    #[tokio::test]
    async fn test_releases_by_version_and_promotions() {
        let (_server, catalog) = catalog().await;
        assert_eq!(catalog.releases_for_version("1.12.2").await.unwrap().len(), 2);
        assert!(catalog.releases_for_version("1.7.10").await.unwrap().is_empty());

        let recommended = catalog.promoted("1.12.2", Promotion::Recommended).await.unwrap();
        assert_eq!(recommended.unwrap().build, 2);
        let latest = catalog.promoted("1.12.2", Promotion::Latest).await.unwrap();
        assert_eq!(latest.unwrap().build, 3);
        assert!(catalog.promoted("1.10.2", Promotion::Latest).await.unwrap().is_none());
    }
}

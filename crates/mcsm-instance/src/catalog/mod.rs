//! Remote catalogs of server releases and mod loader builds.

mod loader;
mod releases;

pub use loader::{
    LoaderCatalog, LoaderFile, LoaderManifest, LoaderRelease, Promotion, RawLoaderBuild,
};
pub use releases::{
    Download, LatestVersions, MojangCatalog, ReleaseCatalog, ReleaseDownloads, ReleaseKind,
    ReleaseManifest, VersionList, VersionManifest, VersionSummary,
};

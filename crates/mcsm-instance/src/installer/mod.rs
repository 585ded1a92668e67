//! Server installation.
//!
//! Drives an instance from nothing to a runnable server: resolve the
//! release, download the server jar, accept the EULA and record the
//! installed version in the instance settings.

mod state;

pub use state::{InstallState, InstallSubscription};

use crate::catalog::{MojangCatalog, ReleaseCatalog};
use crate::files::SettingsPatch;
use crate::instance::Instance;
use mcsm_core::network::{transfer, TransferOptions, TransferProgress};
use mcsm_core::{HttpClient, McsmError, RemoteResource, Result};
use state::Subscribers;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::fs;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// File name of the server jar for `version_id`.
pub fn server_jar_name(version_id: &str) -> String {
    format!("minecraft_server.{}.jar", version_id)
}

/// Releases the installer and clears the live state when an installation
/// ends, however it ends.
struct InstallGuard<'a> {
    running: &'a AtomicBool,
    live: &'a Mutex<Option<InstallState>>,
}

impl Drop for InstallGuard<'_> {
    fn drop(&mut self) {
        *self
            .live
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        self.running.store(false, Ordering::Release);
    }
}

/// Installs the server of one instance.
///
/// At most one installation runs per installer. Outside of a running
/// installation the state is derived from disk.
pub struct Installer {
    instance: Arc<Instance>,
    catalog: Arc<dyn ReleaseCatalog>,
    client: HttpClient,
    subscribers: Arc<Subscribers>,
    running: AtomicBool,
    /// Last published state of the running installation.
    live: Mutex<Option<InstallState>>,
}

impl Installer {
    pub fn new(
        instance: Arc<Instance>,
        catalog: Arc<dyn ReleaseCatalog>,
        client: HttpClient,
    ) -> Self {
        Self {
            instance,
            catalog,
            client,
            subscribers: Arc::new(Subscribers::default()),
            running: AtomicBool::new(false),
            live: Mutex::new(None),
        }
    }

    /// An installer backed by the vanilla release catalog.
    pub fn mojang(instance: Arc<Instance>, client: HttpClient) -> Self {
        let catalog = Arc::new(MojangCatalog::new(client.clone()));
        Self::new(instance, catalog, client)
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    fn lock_live(&self) -> MutexGuard<'_, Option<InstallState>> {
        self.live
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Directory present, server jar present and EULA accepted.
    pub async fn is_installed(&self) -> Result<bool> {
        if !self.instance.exists().await {
            return Ok(false);
        }
        let Some(jar) = self.instance.server_jar_path().await? else {
            return Ok(false);
        };
        if !fs::try_exists(&jar).await.unwrap_or(false) {
            return Ok(false);
        }
        self.instance.eula().is_accepted().await
    }

    /// The running installation's state, otherwise `Installed` or
    /// `NotInstalled` depending on what is on disk.
    pub async fn get_state(&self) -> Result<InstallState> {
        let live = self.lock_live().clone();
        if let Some(state) = live {
            return Ok(state);
        }
        Ok(if self.is_installed().await? {
            InstallState::Installed
        } else {
            InstallState::NotInstalled
        })
    }

    /// Listen for state changes until the subscription is dropped.
    pub fn subscribe(&self) -> InstallSubscription {
        Subscribers::subscribe(&self.subscribers)
    }

    fn set_state(&self, state: InstallState) {
        debug!("Install state of {}: {}", self.instance.directory().display(), state);
        *self.lock_live() = Some(state.clone());
        self.subscribers.publish(&state);
    }

    /// Claim the installer. The live state stays empty until the first
    /// stage is published, so a rejected install never shows as running.
    fn begin(&self) -> Result<InstallGuard<'_>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(McsmError::InstallInProgress {
                directory: self.instance.directory().to_path_buf(),
            });
        }
        Ok(InstallGuard {
            running: &self.running,
            live: &self.live,
        })
    }

    /// Install the server of `version_id`.
    ///
    /// Fails with [`McsmError::AlreadyInstalled`] unless `force` is set or the
    /// instance is not installed yet. `force` also re-downloads the jar and
    /// re-accepts the EULA. Download progress goes to `on_progress` and, as
    /// [`InstallState::Downloading`], to subscribers.
    pub async fn install(
        &self,
        version_id: &str,
        force: bool,
        on_progress: Option<mpsc::UnboundedSender<TransferProgress>>,
    ) -> Result<()> {
        let guard = self.begin()?;
        let result = self.run_install(version_id, force, on_progress).await;
        drop(guard);

        if let Err(e) = &result {
            if !matches!(e, McsmError::AlreadyInstalled { .. }) {
                warn!("Installation of version {} failed: {}", version_id, e);
                let state = self
                    .get_state()
                    .await
                    .unwrap_or(InstallState::NotInstalled);
                self.subscribers.publish(&state);
            }
        }
        result
    }

    async fn run_install(
        &self,
        version_id: &str,
        force: bool,
        on_progress: Option<mpsc::UnboundedSender<TransferProgress>>,
    ) -> Result<()> {
        if !force && self.is_installed().await? {
            let installed = self.instance.settings().read().await?.minecraft_version;
            return Err(McsmError::AlreadyInstalled {
                version_id: installed,
            });
        }

        info!("Starting installation of version {}", version_id);
        self.set_state(InstallState::Preparing);
        let directory = self.instance.directory();
        fs::create_dir_all(directory)
            .await
            .map_err(|e| McsmError::io_with_path(e, directory))?;

        let jar_name = server_jar_name(version_id);
        let jar_present = fs::try_exists(directory.join(&jar_name))
            .await
            .unwrap_or(false);
        if force || !jar_present {
            self.download_server(version_id, &jar_name, directory, on_progress)
                .await?;
        } else {
            debug!("Reusing existing {}", jar_name);
        }

        self.set_state(InstallState::Configuring);
        let eula = self.instance.eula();
        if force || !eula.is_accepted().await? {
            eula.accept().await?;
        }
        self.instance
            .settings()
            .patch(SettingsPatch::installed(version_id, jar_name))
            .await?;

        self.set_state(InstallState::Installed);
        info!(
            "Installed version {} into {}",
            version_id,
            directory.display()
        );
        Ok(())
    }

    async fn download_server(
        &self,
        version_id: &str,
        jar_name: &str,
        directory: &Path,
        on_progress: Option<mpsc::UnboundedSender<TransferProgress>>,
    ) -> Result<()> {
        self.set_state(InstallState::Downloading(None));
        let download = self.catalog.server_download(version_id).await?;
        info!("Downloading {} ({} bytes)", download.url, download.size);

        let remote = RemoteResource::raw(self.client.clone(), download.url.clone());
        let options = TransferOptions::default()
            .with_filename(jar_name)
            .with_expected_length(download.size);

        // The sender lives inside the transfer future, so the forwarding loop
        // ends once the transfer does.
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<TransferProgress>();
        let forward = async {
            while let Some(progress) = progress_rx.recv().await {
                if let Some(on_progress) = &on_progress {
                    let _ = on_progress.send(progress.clone());
                }
                self.set_state(InstallState::Downloading(Some(progress)));
            }
        };
        let (transferred, ()) = tokio::join!(
            transfer(&remote, directory, options, Some(progress_tx)),
            forward
        );
        let jar_path = directory.join(jar_name);
        let result = transferred.and_then(|transferred| {
            if transferred.bytes == download.size {
                Ok(())
            } else {
                Err(McsmError::Transfer {
                    url: download.url.clone(),
                    path: transferred.path().to_path_buf(),
                    message: format!(
                        "expected {} bytes, received {}",
                        download.size, transferred.bytes
                    ),
                })
            }
        });

        // A partial jar would be picked up by the next install.
        if let Err(McsmError::Transfer { .. }) = &result {
            remove_partial(&jar_path).await;
        }
        result
    }
}

async fn remove_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial download {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial download {}: {}", path.display(), e),
    }
}

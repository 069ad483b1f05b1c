use anyhow::Result;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::core::{UpdaterError, user_friendly_error};
use crate::update::config::UpdaterSettings;
use crate::update::installer::BundleInstaller;
use crate::update::local_version::LocalVersion;
use crate::update::manifest::{CachedManifest, Manifest};
use crate::update::{UpdateCheck, UpdateService};

/// Default [`UpdateService`] backed by the release manifest and the
/// per-user bundle on disk.
pub struct AerialUpdateService {
    manifest: CachedManifest,
    installer: BundleInstaller,
    current_version: String,
    // Snapshot taken by the last refresh; the gate works from this copy.
    snapshot: Mutex<Option<Manifest>>,
    non_interactive: AtomicBool,
}

impl AerialUpdateService {
    /// Build the service from settings, caching the manifest in `cache_dir`.
    pub fn new(settings: &UpdaterSettings, cache_dir: PathBuf) -> Result<Self> {
        Ok(Self {
            manifest: CachedManifest::new(
                settings.manifest_url.clone(),
                cache_dir,
                settings.request_timeout(),
            )?,
            installer: BundleInstaller::new(
                settings.install_path(),
                settings.verify_checksum,
                settings.download_timeout(),
            )?,
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            snapshot: Mutex::new(None),
            non_interactive: AtomicBool::new(false),
        })
    }

    /// Override the version the updater reports for itself.
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    /// Version of the running updater.
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    fn snapshot(&self) -> Option<Manifest> {
        self.snapshot.lock().ok().and_then(|guard| guard.clone())
    }

    fn store_snapshot(&self, manifest: Option<Manifest>) {
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = manifest;
        }
    }

    async fn install_latest(&self) -> Result<()> {
        let manifest = self.snapshot().ok_or(UpdaterError::NoReleaseAvailable)?;
        self.installer.install(&manifest.stable).await
    }
}

impl UpdateService for AerialUpdateService {
    fn set_non_interactive(&self) {
        self.non_interactive.store(true, Ordering::SeqCst);
    }

    async fn refresh_now(&self) {
        let manifest = self.manifest.refresh_now().await;
        if manifest.is_none() {
            warn!("No manifest available, proceeding without release information");
        }
        self.store_snapshot(manifest);
    }

    fn needs_updating(&self) -> bool {
        self.snapshot()
            .is_some_and(|m| m.updater_is_outdated(&self.current_version))
    }

    async fn check_for_update(&self) -> UpdateCheck {
        let Some(manifest) = self.snapshot() else {
            return UpdateCheck::none();
        };

        let installed = match LocalVersion::read(self.installer.install_path()).await {
            Ok(version) => version,
            Err(e) => {
                debug!("Could not read installed version: {e:#}");
                None
            }
        };

        let available = manifest.stable.version;
        let update_available = LocalVersion::is_newer(&available, installed.as_deref());
        if update_available {
            info!(
                "Update available: {} -> {}",
                installed.as_deref().unwrap_or("not installed"),
                available
            );
        } else {
            debug!("Installed version {} is current", available);
        }

        UpdateCheck {
            version: available,
            update_available,
        }
    }

    async fn perform_unattended_install(&self) -> Result<()> {
        match self.install_latest().await {
            Ok(()) => Ok(()),
            Err(e) if self.non_interactive.load(Ordering::SeqCst) => {
                warn!("Unattended install failed: {e:#}");
                Err(e)
            }
            Err(e) => {
                let context = user_friendly_error(e);
                context.display();
                Err(context.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::manifest::Release;
    use std::time::Duration;
    use tempfile::TempDir;

    fn settings(install_path: &std::path::Path) -> UpdaterSettings {
        UpdaterSettings {
            manifest_url: "http://127.0.0.1:9/manifest.json".to_string(),
            install_path: install_path.display().to_string(),
            ..Default::default()
        }
    }

    fn manifest() -> Manifest {
        Manifest {
            updater_version: "1.5.0".to_string(),
            stable: Release {
                version: "3.2.1".to_string(),
                url: "http://127.0.0.1:9/Aerial.saver.zip".to_string(),
                sha256: None,
            },
        }
    }

    #[tokio::test]
    async fn test_without_manifest_nothing_is_needed() {
        let temp = TempDir::new().unwrap();
        let service =
            AerialUpdateService::new(&settings(&temp.path().join("Aerial.saver")), temp.path().into())
                .unwrap();

        service.refresh_now().await;

        assert!(!service.needs_updating());
        assert_eq!(service.check_for_update().await, UpdateCheck::none());
        assert!(service.perform_unattended_install().await.is_err());
    }

    #[tokio::test]
    async fn test_cached_manifest_drives_checks() {
        let temp = TempDir::new().unwrap();
        CachedManifest::new("unused", temp.path().into(), Duration::from_secs(5))
            .unwrap()
            .save(&manifest())
            .await
            .unwrap();

        let service =
            AerialUpdateService::new(&settings(&temp.path().join("Aerial.saver")), temp.path().into())
                .unwrap()
                .with_current_version("1.2.0");
        service.set_non_interactive();
        service.refresh_now().await;

        assert!(service.needs_updating());
        let check = service.check_for_update().await;
        assert_eq!(check.version, "3.2.1");
        assert!(check.update_available);
    }

    #[tokio::test]
    async fn test_current_updater_is_not_outdated() {
        let temp = TempDir::new().unwrap();
        CachedManifest::new("unused", temp.path().into(), Duration::from_secs(5))
            .unwrap()
            .save(&manifest())
            .await
            .unwrap();

        let service =
            AerialUpdateService::new(&settings(&temp.path().join("Aerial.saver")), temp.path().into())
                .unwrap()
                .with_current_version("1.5.0");
        service.refresh_now().await;

        assert!(!service.needs_updating());
        assert_eq!(service.current_version(), "1.5.0");
    }
}

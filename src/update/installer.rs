use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::core::UpdaterError;
use crate::update::backup::BundleBackup;
use crate::update::http_client;
use crate::update::manifest::Release;
use crate::update::verification::ChecksumVerifier;

/// Downloads a release archive and swaps it in place of the installed bundle.
///
/// # Install Flow
///
/// ```text
/// 1. Stage     download the archive into a temp dir beside the install path
/// 2. Verify    SHA-256 against the manifest (when published and enabled)
/// 3. Extract   unzip and locate the bundle
/// 4. Swap      move the old bundle to .backup, move the new one in
/// 5. Finish    drop the backup on success, restore it on failure
/// ```
///
/// Staging next to the destination keeps the final move a same-volume rename.
pub struct BundleInstaller {
    install_path: PathBuf,
    verify_checksum: bool,
    client: reqwest::Client,
}

impl BundleInstaller {
    /// Installer targeting `install_path` (e.g. `~/Library/Screen Savers/Aerial.saver`).
    ///
    /// Downloads are abandoned after `download_timeout`.
    pub fn new(
        install_path: PathBuf,
        verify_checksum: bool,
        download_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            install_path,
            verify_checksum,
            client: http_client(download_timeout)?,
        })
    }

    /// Destination of the bundle.
    pub fn install_path(&self) -> &Path {
        &self.install_path
    }

    /// Download, verify and install `release`.
    pub async fn install(&self, release: &Release) -> Result<()> {
        info!("Installing Aerial {}", release.version);

        let staging = self.staging_dir().await?;
        let archive = staging.path().join("release.zip");

        self.download(&release.url, &archive).await?;

        if self.verify_checksum {
            match &release.sha256 {
                Some(expected) => ChecksumVerifier::verify_checksum(&archive, expected).await?,
                None => warn!("Manifest has no checksum for {}, skipping verification", release.version),
            }
        }

        self.install_from_archive(&archive, staging.path()).await
    }

    /// Extract `archive` under `staging` and swap the bundle into place.
    pub async fn install_from_archive(&self, archive: &Path, staging: &Path) -> Result<()> {
        let extracted = staging.join("extracted");
        extract_archive(archive, &extracted).await?;

        let bundle_name = self
            .install_path
            .file_name()
            .context("Install path has no file name")?
            .to_string_lossy()
            .into_owned();
        let bundle = find_bundle(&extracted, &bundle_name).await?;

        let backup = BundleBackup::new(self.install_path.clone());
        let had_previous = backup.create_backup().await?;

        match fs::rename(&bundle, &self.install_path).await {
            Ok(()) => {
                if had_previous && let Err(e) = backup.cleanup_backup().await {
                    debug!("Failed to cleanup backup: {}", e);
                }
                info!("Installed {}", self.install_path.display());
                Ok(())
            }
            Err(e) => {
                if had_previous && let Err(restore_err) = backup.restore_backup().await {
                    warn!(
                        "Failed to restore backup at {}: {}",
                        backup.backup_path().display(),
                        restore_err
                    );
                }
                Err(UpdaterError::InstallFailed {
                    path: self.install_path.display().to_string(),
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }

    async fn staging_dir(&self) -> Result<tempfile::TempDir> {
        let parent = self
            .install_path
            .parent()
            .context("Install path has no parent directory")?;
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        tempfile::Builder::new()
            .prefix(".aerial-staging-")
            .tempdir_in(parent)
            .context("Failed to create staging directory")
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        debug!("Downloading {}", url);

        let to_error = |e: reqwest::Error| UpdaterError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(to_error)?
            .bytes()
            .await
            .map_err(to_error)?;

        fs::write(destination, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", destination.display()))?;

        debug!("Downloaded {} bytes", bytes.len());
        Ok(())
    }
}

/// Unzip `archive` into `destination`.
pub async fn extract_archive(archive: &Path, destination: &Path) -> Result<()> {
    let archive = archive.to_path_buf();
    let destination = destination.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::open(&archive)
            .with_context(|| format!("Failed to open {}", archive.display()))?;
        let mut zip = zip::ZipArchive::new(file).context("Release archive is not a valid zip")?;
        zip.extract(&destination).context("Failed to extract release archive")?;
        Ok(())
    })
    .await
    .context("Extraction task panicked")?
}

/// Find `bundle_name` at the top of `extracted` or one directory below it.
async fn find_bundle(extracted: &Path, bundle_name: &str) -> Result<PathBuf> {
    let direct = extracted.join(bundle_name);
    if direct.exists() {
        return Ok(direct);
    }

    let mut entries = fs::read_dir(extracted)
        .await
        .with_context(|| format!("Failed to read {}", extracted.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name() == "__MACOSX" {
            continue;
        }
        let nested = entry.path().join(bundle_name);
        if nested.exists() {
            return Ok(nested);
        }
    }

    Err(UpdaterError::BundleMissing {
        bundle: bundle_name.to_string(),
    }
    .into())
}

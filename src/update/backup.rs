use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Keeps the previously installed bundle aside while a new one is moved in.
///
/// The backup sits next to the original with a `.backup` suffix
/// (`Aerial.saver.backup`), on the same volume, so every step is a rename.
///
/// ```rust,no_run
/// use aerial_updater::update::backup::BundleBackup;
/// use std::path::PathBuf;
///
/// # async fn example(new_bundle: PathBuf) -> anyhow::Result<()> {
/// let backup = BundleBackup::new(PathBuf::from("/Users/me/Library/Screen Savers/Aerial.saver"));
/// backup.create_backup().await?;
/// match tokio::fs::rename(&new_bundle, backup.original_path()).await {
///     Ok(()) => backup.cleanup_backup().await?,
///     Err(_) => backup.restore_backup().await?,
/// }
/// # Ok(())
/// # }
/// ```
pub struct BundleBackup {
    original_path: PathBuf,
    backup_path: PathBuf,
}

impl BundleBackup {
    /// Backup manager for the bundle at `bundle_path`.
    pub fn new(bundle_path: PathBuf) -> Self {
        let mut backup_path = bundle_path.clone();
        backup_path.set_file_name(format!(
            "{}.backup",
            bundle_path.file_name().unwrap_or_default().to_string_lossy()
        ));

        Self {
            original_path: bundle_path,
            backup_path,
        }
    }

    /// Move the installed bundle aside.
    ///
    /// Returns `false` when nothing was installed, in which case there is
    /// nothing to restore later. A stale backup from an earlier run is
    /// replaced.
    pub async fn create_backup(&self) -> Result<bool> {
        if !self.original_path.exists() {
            debug!("Nothing installed at {:?}, skipping backup", self.original_path);
            return Ok(false);
        }

        if self.backup_path.exists() {
            debug!("Removing old backup at {:?}", self.backup_path);
            remove_any(&self.backup_path).await.context("Failed to remove old backup")?;
        }

        info!("Creating backup at {:?}", self.backup_path);
        fs::rename(&self.original_path, &self.backup_path)
            .await
            .context("Failed to create backup")?;

        Ok(true)
    }

    /// Put the backup back in place, discarding whatever is installed now.
    pub async fn restore_backup(&self) -> Result<()> {
        if !self.backup_path.exists() {
            bail!("No backup found at {:?}", self.backup_path);
        }

        warn!("Restoring from backup at {:?}", self.backup_path);

        if self.original_path.exists() {
            remove_any(&self.original_path)
                .await
                .context("Failed to remove partially installed bundle")?;
        }

        fs::rename(&self.backup_path, &self.original_path)
            .await
            .context("Failed to restore backup")?;

        info!("Successfully restored from backup");
        Ok(())
    }

    /// Delete the backup after a successful install.
    pub async fn cleanup_backup(&self) -> Result<()> {
        if self.backup_path.exists() {
            remove_any(&self.backup_path).await.context("Failed to remove backup")?;
            debug!("Removed backup at {:?}", self.backup_path);
        }
        Ok(())
    }

    /// Whether a backup is present.
    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    /// Path of the installed bundle.
    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    /// Path of the backup.
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }
}

// Bundles are directories, but a plain file is accepted too.
async fn remove_any(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    }
}

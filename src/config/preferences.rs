//! User preferences for the Aerial updater.
//!
//! Preferences live in `~/.aerial-updater/config.toml`. The location can be
//! overridden with the `AERIAL_UPDATER_CONFIG_PATH` environment variable or
//! the `--config` flag. A missing file is not an error: defaults are used and
//! first-run setup is presented on the next interactive launch.
//!
//! ```toml
//! update_mode = "automatic"
//! first_time_setup = true
//!
//! [updater]
//! silent_exit_delay_secs = 20
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::update::config::UpdaterSettings;

/// Environment variable overriding the preferences file location.
pub const CONFIG_PATH_ENV: &str = "AERIAL_UPDATER_CONFIG_PATH";

/// How available updates are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Install updates unattended from silent runs.
    #[default]
    Automatic,
    /// Only notify; the user installs from the menu.
    Manual,
}

/// Read-only view of the preferences consumed by the launch sequence.
pub trait PreferenceStore: Send + Sync {
    /// Preferred way of applying updates.
    fn update_mode(&self) -> UpdateMode;

    /// Whether first-run setup has been completed.
    fn first_time_setup_completed(&self) -> bool;
}

/// Preferences file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Automatic or manual installs.
    #[serde(default)]
    pub update_mode: UpdateMode,

    /// Set once the user has gone through first-run setup.
    #[serde(default)]
    pub first_time_setup: bool,

    /// Release source and install locations.
    #[serde(default, skip_serializing_if = "UpdaterSettings::is_default")]
    pub updater: UpdaterSettings,
}

impl PreferenceStore for Preferences {
    fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    fn first_time_setup_completed(&self) -> bool {
        self.first_time_setup
    }
}

impl Preferences {
    /// Platform default location: `~/.aerial-updater/config.toml`, or the
    /// value of [`CONFIG_PATH_ENV`] when set.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(shellexpand::tilde(&path).into_owned()));
        }

        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".aerial-updater");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path`, or from [`Preferences::default_path`] when `None`.
    ///
    /// Returns defaults if the file does not exist.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!("No preferences at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load preferences from a specific file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read preferences from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse preferences from {}", path.display()))
    }

    /// Save preferences, creating parent directories as needed.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize preferences")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write preferences to {}", path.display()))?;

        debug!("Saved preferences to {}", path.display());
        Ok(())
    }
}

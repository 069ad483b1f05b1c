//! Configuration management for the Aerial updater
//!
//! The updater has a single configuration file holding the user's
//! preferences (update mode, first-run state) and the updater settings
//! (manifest URL, install locations, anti-flap delay).
//!
//! **Location:** `~/.aerial-updater/config.toml`, overridable with
//! `AERIAL_UPDATER_CONFIG_PATH` or `--config`.
//!
//! The launch sequence only reads preferences, through the
//! [`PreferenceStore`] trait. First-run setup is the one place that writes
//! them.

mod preferences;

pub use preferences::{CONFIG_PATH_ENV, PreferenceStore, Preferences, UpdateMode};

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Directory holding the manifest cache, next to the preferences file.
pub fn cache_dir_for(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".aerial-updater"))
}

/// Resolve the preferences path from an optional CLI override.
pub fn resolve_config_path(cli_override: Option<&str>) -> Result<PathBuf> {
    match cli_override {
        Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).into_owned())),
        None => Preferences::default_path(),
    }
}

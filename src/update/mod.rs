//! Release discovery and installation for the Aerial screen saver.
//!
//! The launch sequence only talks to the [`UpdateService`] trait. This module
//! defines that trait and ships the default implementation,
//! [`AerialUpdateService`], built from four pieces:
//!
//! - [`manifest::CachedManifest`] - fetches and caches the release manifest
//! - [`local_version::LocalVersion`] - reads the installed bundle version
//! - [`installer::BundleInstaller`] - downloads, verifies and swaps bundles
//! - [`backup::BundleBackup`] - keeps the previous bundle until the swap succeeds
//!
//! ```text
//! refresh_now()          manifest.json  ──►  snapshot
//! needs_updating()       snapshot.updater_version  >  CARGO_PKG_VERSION
//! check_for_update()     snapshot.stable.version   >  Info.plist version
//! perform_unattended_install()
//!                        download ─► verify ─► extract ─► backup ─► swap
//! ```

use anyhow::{Context, Result};
use std::time::Duration;

pub mod backup;
pub mod config;
pub mod installer;
pub mod local_version;
pub mod manifest;
pub mod service;
pub mod verification;

pub use service::AerialUpdateService;

/// Longest wait for a TCP connection to the release server.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client whose requests give up after `timeout`.
///
/// A server that accepts the connection and never answers must not hold a
/// silent launch forever.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .user_agent(concat!("aerial-updater/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Result of comparing the published release with the installed one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateCheck {
    /// Label of the published version; empty when no manifest is available.
    pub version: String,
    /// Whether the published version should replace the installed one.
    pub update_available: bool,
}

impl UpdateCheck {
    /// No release information.
    pub fn none() -> Self {
        Self::default()
    }

    /// A published `version` that is newer than what is installed.
    pub fn available(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            update_available: true,
        }
    }
}

/// Everything the launch sequence needs from the update machinery.
///
/// Each call is awaited to completion before the caller branches on it.
/// Failures inside `refresh_now` are absorbed by the implementation.
#[allow(async_fn_in_trait)]
pub trait UpdateService: Send + Sync {
    /// Mark the run as unattended: install errors are logged, never shown.
    fn set_non_interactive(&self);

    /// Refresh the release manifest. Idempotent.
    async fn refresh_now(&self);

    /// Whether the running updater is too old to install releases itself.
    fn needs_updating(&self) -> bool;

    /// Compare the published release with the installed bundle.
    async fn check_for_update(&self) -> UpdateCheck;

    /// Install the published release without user interaction.
    async fn perform_unattended_install(&self) -> Result<()>;
}

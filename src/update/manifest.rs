use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::core::UpdaterError;
use crate::update::http_client;

/// A downloadable screen saver release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Release version (e.g. "3.2.1").
    pub version: String,
    /// URL of the zipped `Aerial.saver` bundle.
    pub url: String,
    /// Hex SHA-256 of the archive, optionally prefixed with `sha256:`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// The published release manifest.
///
/// ```json
/// {
///   "updater_version": "1.2.0",
///   "stable": { "version": "3.2.1", "url": "https://…/Aerial.saver.zip", "sha256": "…" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Latest version of the updater itself.
    pub updater_version: String,
    /// Current stable screen saver release.
    pub stable: Release,
}

impl Manifest {
    /// Whether `current` (the running updater) is older than the updater
    /// version published in this manifest.
    ///
    /// Unparseable versions are treated as "not outdated" so a malformed
    /// manifest never forces the redirect path.
    pub fn updater_is_outdated(&self, current: &str) -> bool {
        match (
            semver::Version::parse(current),
            semver::Version::parse(self.updater_version.trim_start_matches('v')),
        ) {
            (Ok(current), Ok(published)) => published > current,
            _ => false,
        }
    }
}

/// Manifest plus the time it was fetched, as stored on disk.
#[derive(Debug, Serialize, Deserialize)]
pub struct CachedEntry {
    /// The manifest contents.
    pub manifest: Manifest,
    /// UTC timestamp of the fetch.
    pub fetched_at: DateTime<Utc>,
}

/// Disk-backed cache of the release manifest.
///
/// `refresh_now` always goes to the network; failures are logged and the
/// previously cached copy stays in place. Readers use [`CachedManifest::load`].
pub struct CachedManifest {
    url: String,
    cache_path: PathBuf,
    client: reqwest::Client,
}

impl CachedManifest {
    /// Cache for `url`, stored as `manifest.json` inside `cache_dir`.
    ///
    /// Each fetch attempt is abandoned after `timeout`.
    pub fn new(url: impl Into<String>, cache_dir: PathBuf, timeout: Duration) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            cache_path: cache_dir.join("manifest.json"),
            client: http_client(timeout)?,
        })
    }

    /// Location of the cache file.
    pub fn cache_path(&self) -> &PathBuf {
        &self.cache_path
    }

    /// Fetch the manifest and persist it, absorbing any failure.
    ///
    /// Returns the freshest manifest available: the fetched one, or the
    /// previously cached copy when the fetch failed.
    pub async fn refresh_now(&self) -> Option<Manifest> {
        match self.update_now().await {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!("Manifest refresh failed, keeping cached copy: {e:#}");
                match self.load().await {
                    Ok(entry) => entry.map(|e| e.manifest),
                    Err(e) => {
                        warn!("Cached manifest unreadable: {e:#}");
                        None
                    }
                }
            }
        }
    }

    /// Fetch the manifest and write it to the cache.
    pub async fn update_now(&self) -> Result<Manifest> {
        let manifest = self.fetch().await?;
        self.save(&manifest).await?;
        info!("Manifest refreshed: stable {}", manifest.stable.version);
        Ok(manifest)
    }

    async fn fetch(&self) -> Result<Manifest> {
        debug!("Fetching manifest from {}", self.url);

        let retry_strategy = tokio_retry::strategy::ExponentialBackoff::from_millis(2)
            .factor(50)
            .max_delay(Duration::from_secs(2))
            .take(3);

        let body = tokio_retry::Retry::spawn(retry_strategy, || async {
            let response = self.client.get(&self.url).send().await?.error_for_status()?;
            response.text().await
        })
        .await
        .map_err(|e| UpdaterError::ManifestUnavailable {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        let manifest: Manifest = serde_json::from_str(&body).map_err(|e| {
            UpdaterError::ManifestUnavailable {
                url: self.url.clone(),
                reason: format!("invalid manifest: {e}"),
            }
        })?;

        Ok(manifest)
    }

    /// Load the cached manifest, if any.
    pub async fn load(&self) -> Result<Option<CachedEntry>> {
        if !self.cache_path.exists() {
            debug!("No manifest cache found");
            return Ok(None);
        }

        let content = fs::read_to_string(&self.cache_path)
            .await
            .context("Failed to read manifest cache")?;

        let entry: CachedEntry =
            serde_json::from_str(&content).context("Failed to parse manifest cache")?;

        Ok(Some(entry))
    }

    /// Write `manifest` to the cache with the current timestamp.
    pub async fn save(&self, manifest: &Manifest) -> Result<()> {
        let entry = CachedEntry {
            manifest: manifest.clone(),
            fetched_at: Utc::now(),
        };
        let content =
            serde_json::to_string_pretty(&entry).context("Failed to serialize manifest cache")?;

        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create cache directory")?;
        }

        fs::write(&self.cache_path, content)
            .await
            .context("Failed to write manifest cache")?;

        debug!("Saved manifest to cache");
        Ok(())
    }
}

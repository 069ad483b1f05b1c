use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default manifest location for stable Aerial releases.
pub const DEFAULT_MANIFEST_URL: &str = "https://aerialscreensaver.github.io/manifest.json";

/// Settings that control where the updater looks for releases and where it
/// installs them.
///
/// Stored under the `[updater]` table of the preferences file:
///
/// ```toml
/// [updater]
/// manifest_url = "https://aerialscreensaver.github.io/manifest.json"
/// install_path = "~/Library/Screen Savers/Aerial.saver"
/// system_install_path = "/Library/Screen Savers/Aerial.saver"
/// silent_exit_delay_secs = 20
/// verify_checksum = true
/// request_timeout_secs = 30
/// download_timeout_secs = 300
/// ```
///
/// Paths may start with `~`; they are expanded when read through
/// [`UpdaterSettings::install_path`] and
/// [`UpdaterSettings::system_install_path`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterSettings {
    /// URL of the JSON release manifest.
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,

    /// Per-user install location of the screen saver bundle.
    #[serde(default = "default_install_path")]
    pub install_path: String,

    /// System-wide location that conflicts with the per-user install.
    #[serde(default = "default_system_install_path")]
    pub system_install_path: String,

    /// How long a silent run with nothing to do waits before exiting.
    ///
    /// Must exceed the launch agent's crash-loop detection window; launchd
    /// throttles jobs that exit in under ten seconds.
    #[serde(default = "default_silent_exit_delay_secs")]
    pub silent_exit_delay_secs: u64,

    /// Whether to verify the SHA-256 of downloaded archives when the manifest
    /// publishes one.
    #[serde(default = "default_verify_checksum")]
    pub verify_checksum: bool,

    /// Upper bound on a single manifest request, connection included.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound on downloading a release archive.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            manifest_url: default_manifest_url(),
            install_path: default_install_path(),
            system_install_path: default_system_install_path(),
            silent_exit_delay_secs: default_silent_exit_delay_secs(),
            verify_checksum: default_verify_checksum(),
            request_timeout_secs: default_request_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

fn default_manifest_url() -> String {
    DEFAULT_MANIFEST_URL.to_string()
}

fn default_install_path() -> String {
    "~/Library/Screen Savers/Aerial.saver".to_string()
}

fn default_system_install_path() -> String {
    "/Library/Screen Savers/Aerial.saver".to_string()
}

fn default_silent_exit_delay_secs() -> u64 {
    20
}

fn default_verify_checksum() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_download_timeout_secs() -> u64 {
    300
}

impl UpdaterSettings {
    /// Per-user bundle path with `~` expanded.
    pub fn install_path(&self) -> PathBuf {
        expand(&self.install_path)
    }

    /// System-wide bundle path with `~` expanded.
    pub fn system_install_path(&self) -> PathBuf {
        expand(&self.system_install_path)
    }

    /// The anti-flap delay as a [`Duration`].
    pub fn silent_exit_delay(&self) -> Duration {
        Duration::from_secs(self.silent_exit_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub(crate) fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = UpdaterSettings::default();
        assert_eq!(settings.silent_exit_delay(), Duration::from_secs(20));
        assert!(settings.verify_checksum);
        assert_eq!(
            settings.system_install_path(),
            PathBuf::from("/Library/Screen Savers/Aerial.saver")
        );
        assert!(settings.is_default());
    }

    #[test]
    fn test_tilde_is_expanded() {
        let settings = UpdaterSettings::default();
        let path = settings.install_path();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("Library/Screen Savers/Aerial.saver"));
    }

    #[test]
    fn test_partial_table_uses_defaults() {
        let settings: UpdaterSettings = toml::from_str("silent_exit_delay_secs = 30").unwrap();
        assert_eq!(settings.silent_exit_delay_secs, 30);
        assert_eq!(settings.manifest_url, DEFAULT_MANIFEST_URL);
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.download_timeout(), Duration::from_secs(300));
    }
}

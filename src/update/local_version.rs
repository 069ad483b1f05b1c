use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Version of the screen saver bundle installed at a given path.
pub struct LocalVersion;

impl LocalVersion {
    /// Read `CFBundleShortVersionString` from `<bundle>/Contents/Info.plist`.
    ///
    /// Returns `Ok(None)` when no bundle is installed.
    pub async fn read(bundle: &Path) -> Result<Option<String>> {
        let plist = bundle.join("Contents").join("Info.plist");
        if !plist.exists() {
            debug!("No installed bundle at {}", bundle.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&plist)
            .await
            .with_context(|| format!("Failed to read {}", plist.display()))?;

        Ok(Self::parse(&content))
    }

    /// Extract the short version string from Info.plist XML.
    pub fn parse(plist: &str) -> Option<String> {
        let re =
            Regex::new(r"<key>CFBundleShortVersionString</key>\s*<string>([^<]+)</string>").ok()?;
        re.captures(plist).map(|caps| caps[1].trim().to_string())
    }

    /// Whether `available` is newer than `installed`.
    ///
    /// Nothing installed always counts as outdated. Aerial versions are
    /// occasionally two-component ("3.2"), so missing components are padded
    /// before semver comparison. When either side is still unparseable the
    /// installed bundle is kept, since replacing it could be a downgrade.
    pub fn is_newer(available: &str, installed: Option<&str>) -> bool {
        let Some(installed) = installed else {
            return true;
        };

        match (lenient_parse(available), lenient_parse(installed)) {
            (Some(available), Some(installed)) => available > installed,
            _ => {
                debug!(
                    "Cannot compare versions {:?} and {:?}, keeping the installed bundle",
                    available, installed
                );
                false
            }
        }
    }
}

fn lenient_parse(version: &str) -> Option<semver::Version> {
    let version = version.trim().trim_start_matches('v');
    if let Ok(parsed) = semver::Version::parse(version) {
        return Some(parsed);
    }

    let parts = version.split('.').count();
    let padded = match parts {
        1 => format!("{version}.0.0"),
        2 => format!("{version}.0"),
        _ => return None,
    };
    semver::Version::parse(&padded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
	<key>CFBundleIdentifier</key>
	<string>com.johncoates.Aerial</string>
	<key>CFBundleShortVersionString</key>
	<string>3.2.1</string>
</dict>
</plist>"#;

    #[test]
    fn test_parse_plist() {
        assert_eq!(LocalVersion::parse(PLIST).as_deref(), Some("3.2.1"));
        assert_eq!(LocalVersion::parse("<plist/>"), None);
    }

    #[tokio::test]
    async fn test_read_installed_bundle() {
        let temp = TempDir::new().unwrap();
        let bundle = temp.path().join("Aerial.saver");
        tokio::fs::create_dir_all(bundle.join("Contents")).await.unwrap();
        tokio::fs::write(bundle.join("Contents/Info.plist"), PLIST).await.unwrap();

        let version = LocalVersion::read(&bundle).await.unwrap();
        assert_eq!(version.as_deref(), Some("3.2.1"));
    }

    #[tokio::test]
    async fn test_read_missing_bundle() {
        let temp = TempDir::new().unwrap();
        let version = LocalVersion::read(&temp.path().join("Aerial.saver")).await.unwrap();
        assert!(version.is_none());
    }

    #[test]
    fn test_is_newer() {
        assert!(LocalVersion::is_newer("3.2.1", None));
        assert!(LocalVersion::is_newer("3.2.1", Some("3.2.0")));
        assert!(LocalVersion::is_newer("3.3", Some("3.2.9")));
        assert!(!LocalVersion::is_newer("3.2.1", Some("3.2.1")));
        assert!(!LocalVersion::is_newer("3.2.0", Some("3.2.1")));
    }

    #[test]
    fn test_unparseable_installed_version_is_kept() {
        assert!(!LocalVersion::is_newer("3.2.0", Some("3.2.1 beta")));
        assert!(!LocalVersion::is_newer("3.2.1", Some("3.2.1 beta")));
        assert!(!LocalVersion::is_newer("beta-7", Some("beta-6")));
        assert!(!LocalVersion::is_newer("not-a-version", Some("3.2.1")));
    }
}

use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

use crate::core::UpdaterError;
use crate::presentation::PresentationBridge;

const CONFLICT_TITLE: &str = "Aerial is currently installed for All Users";
const CONFLICT_TEXT: &str = "In order for the updater to work, you need to uninstall the current version of Aerial.\n\nYou can do this by deleting the Aerial.saver file in the folder that just opened. Press Try Again when done.";
const TRY_AGAIN: &str = "Try Again";
const QUIT: &str = "Quit";

/// Detects an installation that prevents the updater from working.
pub trait ConflictDetector: Send + Sync {
    /// Whether the conflicting installation exists right now.
    fn is_conflicting_install_present(&self) -> bool;

    /// Where the conflicting installation lives.
    fn conflicting_install_path(&self) -> PathBuf;
}

/// A system-wide bundle shadowing the per-user install.
#[derive(Debug, Clone)]
pub struct SystemWideInstall {
    path: PathBuf,
}

impl SystemWideInstall {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConflictDetector for SystemWideInstall {
    fn is_conflicting_install_present(&self) -> bool {
        self.path.exists()
    }

    fn conflicting_install_path(&self) -> PathBuf {
        self.path.clone()
    }
}

/// Result of [`InstallGuard::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// No conflict, or the user removed it.
    Clear,
    /// The user chose to quit.
    Terminate,
}

/// Blocks startup while a conflicting installation exists.
///
/// The user is shown the offending bundle and asked to remove it. There is
/// no retry limit: the loop ends when the bundle is gone or the user quits.
pub struct InstallGuard<'a> {
    detector: &'a dyn ConflictDetector,
    bridge: &'a dyn PresentationBridge,
}

impl<'a> InstallGuard<'a> {
    pub fn new(detector: &'a dyn ConflictDetector, bridge: &'a dyn PresentationBridge) -> Self {
        Self { detector, bridge }
    }

    pub fn resolve(&self) -> GuardOutcome {
        if !self.detector.is_conflicting_install_present() {
            return GuardOutcome::Clear;
        }

        let path = self.detector.conflicting_install_path();
        warn!(
            "{}",
            UpdaterError::InstallConflict {
                path: path.display().to_string()
            }
        );

        self.bridge.activate();
        self.bridge.reveal_file(&path);

        let message = format!("{CONFLICT_TITLE}\n\n{CONFLICT_TEXT}");
        let mut attempts = 0u32;
        while self.detector.is_conflicting_install_present() {
            attempts += 1;
            if !self.bridge.show_blocking_choice(&message, TRY_AGAIN, QUIT) {
                info!("User quit with the conflicting installation in place");
                return GuardOutcome::Terminate;
            }
        }

        info!("Conflicting installation removed after {} prompt(s)", attempts);
        GuardOutcome::Clear
    }
}

/// Name of the mounted `Aerial*` volume `executable` runs from, if any.
///
/// Running straight from the downloaded disk image means the app was never
/// copied to Applications.
pub fn disk_image_volume(executable: &Path) -> Option<String> {
    let mut components = executable.components();

    if components.next() != Some(Component::RootDir) {
        return None;
    }
    match components.next() {
        Some(Component::Normal(dir)) if dir == "Volumes" => {}
        _ => return None,
    }

    let volume = components.next()?.as_os_str().to_str()?;
    volume.starts_with("Aerial").then(|| volume.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RecordingBridge, ScriptedConflict};

    #[test]
    fn test_no_conflict_has_no_side_effects() {
        let detector = ScriptedConflict::absent();
        let bridge = RecordingBridge::new();

        assert_eq!(InstallGuard::new(&detector, &bridge).resolve(), GuardOutcome::Clear);
        assert!(bridge.calls().is_empty());
    }

    #[test]
    fn test_conflict_cleared_after_retries() {
        let detector = ScriptedConflict::resolved_after(3);
        let bridge = RecordingBridge::new().with_choices([true, true, true]);

        assert_eq!(InstallGuard::new(&detector, &bridge).resolve(), GuardOutcome::Clear);
        assert_eq!(bridge.choice_count(), 3);
        assert_eq!(bridge.calls()[0], "activate");
        assert!(bridge.calls()[1].starts_with("reveal_file"));
    }

    #[test]
    fn test_quit_terminates() {
        let detector = ScriptedConflict::present();
        let bridge = RecordingBridge::new().with_choices([true, false]);

        assert_eq!(InstallGuard::new(&detector, &bridge).resolve(), GuardOutcome::Terminate);
        assert_eq!(bridge.choice_count(), 2);
    }

    #[test]
    fn test_system_wide_install_detection() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("Aerial.saver");
        let detector = SystemWideInstall::new(&path);

        assert!(!detector.is_conflicting_install_present());
        std::fs::create_dir(&path).unwrap();
        assert!(detector.is_conflicting_install_present());
        assert_eq!(detector.conflicting_install_path(), path);
    }

    #[test]
    fn test_disk_image_volume() {
        assert_eq!(
            disk_image_volume(Path::new("/Volumes/Aerial 1.2/AerialUpdater.app/Contents/MacOS/x")),
            Some("Aerial 1.2".to_string())
        );
        assert_eq!(disk_image_volume(Path::new("/Volumes/Backup/aerial-updater")), None);
        assert_eq!(disk_image_volume(Path::new("/Applications/AerialUpdater.app")), None);
        assert_eq!(disk_image_volume(Path::new("Volumes/Aerial/x")), None);
    }
}

//! Launch sequence of the updater.
//!
//! [`LifecycleController::launch`] runs once per process and returns a
//! [`LaunchOutcome`] telling the binary whether to stay resident or exit.
//!
//! ```text
//! Starting ─► GuardResolving ─┬─► Terminating (user quit / disk image)
//!                             │
//!                             ├─► ModeSilent ─┬─► Terminating (installed / nothing to do)
//!                             │               │
//!                             │               ▼
//!                             └─────────► ModeInteractive ─► Resident
//! ```
//!
//! The silent path is what the periodic launch agent runs. When there is
//! nothing to do it waits [`DEFAULT_SILENT_EXIT_DELAY`] before exiting so the
//! supervisor does not mistake a quick clean exit for a crash loop.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PreferenceStore;
use crate::core::UpdaterError;
use crate::presentation::{IconState, PresentationBridge};
use crate::update::UpdateService;

pub mod gate;
pub mod guard;

pub use gate::{GateInputs, UpdateDecision, UpdateGate};
pub use guard::{ConflictDetector, GuardOutcome, InstallGuard, SystemWideInstall};

#[cfg(test)]
mod tests;

/// Argument selecting the silent path.
pub const SILENT_FLAG: &str = "--silent";

/// Default wait before a silent run with nothing to do exits.
pub const DEFAULT_SILENT_EXIT_DELAY: Duration = Duration::from_secs(20);

const DISK_IMAGE_TITLE: &str = "Oops";
const DISK_IMAGE_TEXT: &str = "Aerial can only be run from the Applications folder. Drag Aerial to Applications, then open Applications and run it again.";

/// How the process was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Started by the user.
    Interactive,
    /// Started by the launch agent.
    Silent,
}

impl LaunchMode {
    /// Silent when [`SILENT_FLAG`] appears anywhere in `args`.
    pub fn classify<S: AsRef<str>>(args: &[S]) -> Self {
        if args.iter().any(|arg| arg.as_ref() == SILENT_FLAG) {
            Self::Silent
        } else {
            Self::Interactive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    GuardResolving,
    ModeSilent,
    ModeInteractive,
    Resident,
    Terminating,
}

/// Why a launch ended in termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    ConflictNotResolved,
    RunningFromDiskImage,
    UpdateInstalled,
    NothingToDo,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ConflictNotResolved => "conflicting installation not removed",
            Self::RunningFromDiskImage => "running from the disk image",
            Self::UpdateInstalled => "update installed",
            Self::NothingToDo => "no update needed",
        };
        f.write_str(text)
    }
}

/// What the process should do after [`LifecycleController::launch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Menu built; keep running.
    Resident,
    /// First-run setup started; it owns the rest of the lifecycle.
    FirstRunSetup,
    /// Exit now.
    Terminate(ExitReason),
}

enum SilentResult {
    Done(ExitReason),
    StayResident { notify: bool },
}

/// Drives a single launch from guard to resident or exit.
pub struct LifecycleController<'a, S: UpdateService> {
    service: &'a S,
    bridge: &'a dyn PresentationBridge,
    preferences: &'a dyn PreferenceStore,
    detector: &'a dyn ConflictDetector,
    exit_delay: Duration,
    executable_path: Option<PathBuf>,
    icon: IconState,
    state: LifecycleState,
}

impl<'a, S: UpdateService> LifecycleController<'a, S> {
    pub fn new(
        service: &'a S,
        bridge: &'a dyn PresentationBridge,
        preferences: &'a dyn PreferenceStore,
        detector: &'a dyn ConflictDetector,
    ) -> Self {
        Self {
            service,
            bridge,
            preferences,
            detector,
            exit_delay: DEFAULT_SILENT_EXIT_DELAY,
            executable_path: None,
            icon: IconState::Normal,
            state: LifecycleState::Starting,
        }
    }

    /// Override the anti-flap delay of the silent path.
    pub fn with_exit_delay(mut self, delay: Duration) -> Self {
        self.exit_delay = delay;
        self
    }

    /// Location of the running executable, checked against mounted disk images.
    pub fn with_executable_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Last icon state sent to the bridge.
    pub fn icon(&self) -> IconState {
        self.icon
    }

    /// Run the launch sequence for `args`.
    pub async fn launch(&mut self, args: &[String]) -> LaunchOutcome {
        self.state = LifecycleState::GuardResolving;
        if InstallGuard::new(self.detector, self.bridge).resolve() == GuardOutcome::Terminate {
            return self.terminate(ExitReason::ConflictNotResolved);
        }

        if let Some(exe) = &self.executable_path
            && let Some(volume) = guard::disk_image_volume(exe)
        {
            warn!("{}", UpdaterError::RunningFromDiskImage { volume });
            self.bridge.show_error_alert(DISK_IMAGE_TITLE, DISK_IMAGE_TEXT);
            return self.terminate(ExitReason::RunningFromDiskImage);
        }

        let mode = LaunchMode::classify(args);
        debug!("Launch mode: {:?}", mode);

        let mut notify = false;
        if mode == LaunchMode::Silent {
            self.state = LifecycleState::ModeSilent;
            match self.silent_check().await {
                SilentResult::Done(reason) => return self.terminate(reason),
                SilentResult::StayResident { notify: pending } => {
                    debug!("Falling back to the menu");
                    notify = pending;
                }
            }
        }

        self.state = LifecycleState::ModeInteractive;
        self.present(notify)
    }

    async fn silent_check(&mut self) -> SilentResult {
        self.service.set_non_interactive();
        self.service.refresh_now().await;

        let local_outdated = self.service.needs_updating();
        let remote = if local_outdated {
            info!("Updater is outdated, skipping the release check");
            self.set_icon(IconState::Normal);
            None
        } else {
            Some(self.service.check_for_update().await)
        };

        let decision = UpdateGate::decide(&GateInputs {
            cache_refreshed: true,
            local_outdated,
            remote,
            preferred_mode: self.preferences.update_mode(),
        });

        match decision {
            UpdateDecision::ForcedRedirect => SilentResult::StayResident { notify: false },
            UpdateDecision::UpdateAvailable {
                version,
                auto_install: true,
            } => {
                info!("Installing {} unattended", version);
                self.set_icon(IconState::Updating);
                match self.service.perform_unattended_install().await {
                    Ok(()) => {
                        info!("Installed {}", version);
                        SilentResult::Done(ExitReason::UpdateInstalled)
                    }
                    Err(e) => {
                        warn!("Install of {} failed: {e:#}", version);
                        SilentResult::StayResident { notify: true }
                    }
                }
            }
            UpdateDecision::UpdateAvailable {
                version,
                auto_install: false,
            } => {
                info!("Update {} waiting for the user", version);
                SilentResult::StayResident { notify: true }
            }
            UpdateDecision::NoUpdateNeeded => {
                info!("No new version, quitting in {}s", self.exit_delay.as_secs());
                tokio::time::sleep(self.exit_delay).await;
                SilentResult::Done(ExitReason::NothingToDo)
            }
        }
    }

    fn present(&mut self, notify: bool) -> LaunchOutcome {
        if !self.preferences.first_time_setup_completed() {
            info!("Starting first-run setup");
            self.bridge.present_first_run_setup();
            self.state = LifecycleState::Resident;
            return LaunchOutcome::FirstRunSetup;
        }

        self.set_icon(IconState::Normal);
        self.bridge.build_menu();
        if notify {
            self.set_icon(IconState::Notification);
        }

        self.state = LifecycleState::Resident;
        LaunchOutcome::Resident
    }

    fn set_icon(&mut self, state: IconState) {
        self.icon = state;
        self.bridge.set_icon(state);
    }

    fn terminate(&mut self, reason: ExitReason) -> LaunchOutcome {
        info!("Terminating: {}", reason);
        self.state = LifecycleState::Terminating;
        LaunchOutcome::Terminate(reason)
    }
}

//! Test utilities for the Aerial updater
//!
//! Scriptable doubles for the collaborators of the launch sequence, plus
//! logging setup for tests. Available to unit tests and, through the
//! `test-utils` feature, to the integration tests under `tests/`.
//!
//! # Example
//!
//! ```rust,no_run
//! use aerial_updater::config::UpdateMode;
//! use aerial_updater::lifecycle::LifecycleController;
//! use aerial_updater::test_utils::{RecordingBridge, ScriptedConflict, ScriptedUpdateService, preferences};
//!
//! # async fn demo() {
//! let service = ScriptedUpdateService::new().with_update("3.2.1");
//! let bridge = RecordingBridge::new();
//! let prefs = preferences(UpdateMode::Manual, true);
//! let detector = ScriptedConflict::absent();
//!
//! let mut controller = LifecycleController::new(&service, &bridge, &prefs, &detector);
//! controller.launch(&["--silent".to_string()]).await;
//! assert_eq!(bridge.count("build_menu"), 1);
//! # }
//! ```

use anyhow::{Result, anyhow};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::{Preferences, UpdateMode};
use crate::lifecycle::ConflictDetector;
use crate::presentation::{IconState, PresentationBridge};
use crate::update::{UpdateCheck, UpdateService};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Preferences with the given mode and first-run state, defaults otherwise.
pub fn preferences(update_mode: UpdateMode, first_time_setup: bool) -> Preferences {
    Preferences {
        update_mode,
        first_time_setup,
        ..Default::default()
    }
}

/// [`PresentationBridge`] that records every call.
///
/// Blocking choices are answered from a script; once it runs out every
/// further choice answers "quit" so a guard loop cannot spin forever.
#[derive(Default)]
pub struct RecordingBridge {
    calls: Mutex<Vec<String>>,
    icons: Mutex<Vec<IconState>>,
    choices: Mutex<VecDeque<bool>>,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers for successive `show_blocking_choice` calls.
    pub fn with_choices(self, choices: impl IntoIterator<Item = bool>) -> Self {
        self.choices.lock().unwrap().extend(choices);
        self
    }

    /// Call log, e.g. `["activate", "reveal_file(/x)", "show_blocking_choice"]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls whose log entry starts with `name`.
    pub fn count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(name))
            .count()
    }

    pub fn choice_count(&self) -> usize {
        self.count("show_blocking_choice")
    }

    /// Icon states in the order they were set.
    pub fn icons(&self) -> Vec<IconState> {
        self.icons.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl PresentationBridge for RecordingBridge {
    fn set_icon(&self, state: IconState) {
        self.icons.lock().unwrap().push(state);
        self.record(format!("set_icon({state:?})"));
    }

    fn show_blocking_choice(&self, _message: &str, _option_a: &str, _option_b: &str) -> bool {
        self.record("show_blocking_choice");
        self.choices.lock().unwrap().pop_front().unwrap_or(false)
    }

    fn reveal_file(&self, path: &Path) {
        self.record(format!("reveal_file({})", path.display()));
    }

    fn activate(&self) {
        self.record("activate");
    }

    fn show_error_alert(&self, title: &str, _text: &str) {
        self.record(format!("show_error_alert({title})"));
    }

    fn present_first_run_setup(&self) {
        self.record("present_first_run_setup");
    }

    fn build_menu(&self) {
        self.record("build_menu");
    }
}

/// [`UpdateService`] with canned answers that records every call.
#[derive(Default)]
pub struct ScriptedUpdateService {
    calls: Mutex<Vec<&'static str>>,
    needs_updating: bool,
    check: UpdateCheck,
    install_fails: bool,
}

impl ScriptedUpdateService {
    /// Nothing outdated, nothing to install.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the running updater as outdated.
    pub fn outdated(mut self) -> Self {
        self.needs_updating = true;
        self
    }

    /// Report `version` as an available release.
    pub fn with_update(mut self, version: &str) -> Self {
        self.check = UpdateCheck::available(version);
        self
    }

    /// Make `perform_unattended_install` fail.
    pub fn failing_install(mut self) -> Self {
        self.install_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == name).count()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl UpdateService for ScriptedUpdateService {
    fn set_non_interactive(&self) {
        self.record("set_non_interactive");
    }

    async fn refresh_now(&self) {
        self.record("refresh_now");
    }

    fn needs_updating(&self) -> bool {
        self.record("needs_updating");
        self.needs_updating
    }

    async fn check_for_update(&self) -> UpdateCheck {
        self.record("check_for_update");
        self.check.clone()
    }

    async fn perform_unattended_install(&self) -> Result<()> {
        self.record("perform_unattended_install");
        if self.install_fails {
            Err(anyhow!("scripted install failure"))
        } else {
            Ok(())
        }
    }
}

/// [`ConflictDetector`] reporting a conflict for a fixed number of checks.
pub struct ScriptedConflict {
    present_checks: AtomicUsize,
    checks: AtomicUsize,
    path: PathBuf,
}

impl ScriptedConflict {
    fn with_present_checks(count: usize) -> Self {
        Self {
            present_checks: AtomicUsize::new(count),
            checks: AtomicUsize::new(0),
            path: PathBuf::from("/Library/Screen Savers/Aerial.saver"),
        }
    }

    /// Never conflicting.
    pub fn absent() -> Self {
        Self::with_present_checks(0)
    }

    /// Always conflicting.
    pub fn present() -> Self {
        Self::with_present_checks(usize::MAX)
    }

    /// Conflicting until the user has been prompted `retries` times.
    pub fn resolved_after(retries: usize) -> Self {
        Self::with_present_checks(retries + 1)
    }

    /// How many times presence was checked.
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl ConflictDetector for ScriptedConflict {
    fn is_conflicting_install_present(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.present_checks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn conflicting_install_path(&self) -> PathBuf {
        self.path.clone()
    }
}

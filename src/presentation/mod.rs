//! User-facing surface of the updater.
//!
//! The launch sequence never touches the terminal (or any UI) directly. It
//! talks to a [`PresentationBridge`], which the binary backs with
//! [`terminal::TerminalBridge`] and tests back with a recording double.
//!
//! Icon updates are fire-and-forget: implementations forward them to the
//! context that owns the UI and return immediately, so callers must not
//! assume the icon has changed by the time `set_icon` returns.

use std::path::Path;

pub mod terminal;

pub use terminal::{TerminalBridge, TerminalUi, UiMessage};

/// Status indicator shown while the updater is resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconState {
    /// Idle, nothing pending.
    Normal,
    /// An install is in progress.
    Updating,
    /// An update is waiting for the user.
    Notification,
}

/// Capabilities the launch sequence needs from the UI.
pub trait PresentationBridge: Send + Sync {
    /// Mirror the icon state. Safe to call from any context; never fails.
    fn set_icon(&self, state: IconState);

    /// Ask the user to pick between two options, blocking until they answer.
    ///
    /// Returns `true` for `option_a`, `false` for `option_b`.
    fn show_blocking_choice(&self, message: &str, option_a: &str, option_b: &str) -> bool;

    /// Show `path` in the platform file browser.
    fn reveal_file(&self, path: &Path);

    /// Bring the application to the foreground.
    fn activate(&self) {}

    /// Show a modal error message.
    fn show_error_alert(&self, title: &str, text: &str);

    /// Start first-run setup. The setup flow owns the rest of the lifecycle.
    fn present_first_run_setup(&self);

    /// Build the resident menu.
    fn build_menu(&self);
}

//! Aerial Updater - background updater for the Aerial screen saver
//!
//! The updater runs in two ways:
//!
//! - **Interactive**: started by the user, stays resident with a menu.
//! - **Silent** (`--silent`): started periodically by a launch agent. It
//!   refreshes the release manifest, installs or announces a new release and
//!   exits when there is nothing to do.
//!
//! Before either runs, a system-wide installation of the screen saver blocks
//! startup until the user removes it or quits.
//!
//! # Modules
//!
//! - [`lifecycle`] - launch sequence: install guard, update gate, controller
//! - [`update`] - release manifest, version checks and unattended installs
//! - [`presentation`] - the UI seam and its terminal implementation
//! - [`config`] - preferences file (`~/.aerial-updater/config.toml`)
//! - [`cli`] - command-line parsing and process wiring
//! - [`core`] - error types and user-facing error rendering
//!
//! # Preferences
//!
//! ```toml
//! update_mode = "manual"
//! first_time_setup = true
//!
//! [updater]
//! manifest_url = "https://aerialscreensaver.github.io/manifest.json"
//! silent_exit_delay_secs = 20
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod lifecycle;
pub mod presentation;
pub mod update;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

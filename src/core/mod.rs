//! Core types shared across the updater.
//!
//! - [`UpdaterError`] - typed failures of the updater and its collaborators
//! - [`ErrorContext`] - user-facing wrapper with details and suggestions
//! - [`user_friendly_error`] - convert any error for CLI display

pub mod error;

pub use error::{ErrorContext, UpdaterError, user_friendly_error};

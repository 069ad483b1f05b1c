//! Error handling for the Aerial updater
//!
//! The updater distinguishes very few failure classes at its decision layer:
//! a conflicting installation, a failed install, and everything else. This
//! module provides:
//! - [`UpdaterError`] - typed failures raised by the default collaborators
//! - [`ErrorContext`] - wrapper that adds user-facing details and suggestions
//! - [`user_friendly_error`] - converts any [`anyhow::Error`] for CLI display
//!
//! # Propagation
//!
//! Collaborator failures never abort the launch sequence. A failed manifest
//! refresh is logged and absorbed by the cache, a failed unattended install
//! sends the controller down the resident path. Only configuration loading
//! failures reach `main`, where they are rendered with [`ErrorContext::display`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use aerial_updater::core::{UpdaterError, user_friendly_error};
//!
//! let error = UpdaterError::InstallConflict {
//!     path: "/Library/Screen Savers/Aerial.saver".to_string(),
//! };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Typed failures of the updater and its default collaborators.
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// A system-wide installation blocks the per-user updater.
    ///
    /// Only recovered through the retry/quit loop of the install guard; it is
    /// never bypassed silently.
    #[error("Aerial is installed for all users at {path}")]
    InstallConflict {
        /// Path of the conflicting bundle
        path: String,
    },

    /// The executable runs from a mounted disk image instead of Applications.
    #[error("Aerial Updater is running from the disk image volume {volume}")]
    RunningFromDiskImage {
        /// Name of the mounted volume
        volume: String,
    },

    /// The manifest could not be fetched or parsed.
    #[error("Failed to refresh the release manifest from {url}: {reason}")]
    ManifestUnavailable {
        /// Manifest URL
        url: String,
        /// Underlying reason
        reason: String,
    },

    /// The manifest did not list a release to install.
    #[error("The release manifest does not contain an installable release")]
    NoReleaseAvailable,

    /// Downloading a release archive failed.
    #[error("Failed to download {url}: {reason}")]
    DownloadFailed {
        /// Archive URL
        url: String,
        /// Underlying reason
        reason: String,
    },

    /// A downloaded archive does not match the published checksum.
    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// File that was verified
        file: String,
        /// Published checksum
        expected: String,
        /// Computed checksum
        actual: String,
    },

    /// The release archive did not contain the expected bundle.
    #[error("Release archive does not contain {bundle}")]
    BundleMissing {
        /// Expected bundle name
        bundle: String,
    },

    /// Replacing the installed bundle failed.
    #[error("Failed to install {path}: {reason}")]
    InstallFailed {
        /// Install destination
        path: String,
        /// Underlying reason
        reason: String,
    },

    /// Preferences could not be loaded or saved.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// An [`UpdaterError`] with optional details and a suggested fix.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdaterError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    #[must_use]
    pub const fn new(error: UpdaterError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow,
    /// suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to an [`ErrorContext`] with actionable suggestions.
///
/// Recognizes [`UpdaterError`] variants, [`std::io::Error`] kinds and TOML
/// parse errors; anything else is wrapped as [`UpdaterError::Other`] with the
/// full `anyhow` chain as its message.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(updater_error) = error.downcast_ref::<UpdaterError>() {
        return create_error_context(updater_error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(UpdaterError::Other {
                    message: format!("{error:#}"),
                })
                .with_suggestion("Check that your user owns ~/Library/Screen Savers")
                .with_details("The updater only writes to per-user locations");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(UpdaterError::Other {
                    message: format!("{error:#}"),
                })
                .with_suggestion("Check that the configured paths exist");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(UpdaterError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Fix the TOML syntax in ~/.aerial-updater/config.toml or delete the file to restore defaults");
    }

    ErrorContext::new(UpdaterError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: &UpdaterError) -> ErrorContext {
    match error {
        UpdaterError::InstallConflict { path } => ErrorContext::new(UpdaterError::InstallConflict {
            path: path.clone(),
        })
        .with_suggestion(format!("Delete {path} in Finder, then try again"))
        .with_details("The updater manages the per-user copy and cannot update an install shared by all users"),
        UpdaterError::RunningFromDiskImage { volume } => {
            ErrorContext::new(UpdaterError::RunningFromDiskImage {
                volume: volume.clone(),
            })
            .with_suggestion("Drag Aerial Updater to Applications, then run it from there")
        }
        UpdaterError::ChecksumMismatch {
            file,
            expected,
            actual,
        } => ErrorContext::new(UpdaterError::ChecksumMismatch {
            file: file.clone(),
            expected: expected.clone(),
            actual: actual.clone(),
        })
        .with_suggestion("Retry later; the download may have been truncated")
        .with_details("The installed version was left untouched"),
        UpdaterError::ManifestUnavailable { url, reason } => {
            ErrorContext::new(UpdaterError::ManifestUnavailable {
                url: url.clone(),
                reason: reason.clone(),
            })
            .with_suggestion("Check your network connection")
        }
        UpdaterError::DownloadFailed { url, reason } => {
            ErrorContext::new(UpdaterError::DownloadFailed {
                url: url.clone(),
                reason: reason.clone(),
            })
            .with_suggestion("Check your network connection")
        }
        other => ErrorContext::new(UpdaterError::Other {
            message: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_conflict_has_suggestion() {
        let error = UpdaterError::InstallConflict {
            path: "/Library/Screen Savers/Aerial.saver".to_string(),
        };
        let ctx = user_friendly_error(anyhow::Error::from(error));

        assert!(matches!(ctx.error, UpdaterError::InstallConflict { .. }));
        assert!(ctx.suggestion.unwrap().contains("/Library/Screen Savers/Aerial.saver"));
    }

    #[test]
    fn test_io_permission_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let ctx = user_friendly_error(anyhow::Error::from(io));

        assert!(ctx.suggestion.is_some());
        assert!(ctx.to_string().contains("denied"));
    }

    #[test]
    fn test_generic_error_keeps_chain() {
        let error = anyhow::anyhow!("inner").context("outer");
        let ctx = user_friendly_error(error);

        let rendered = ctx.to_string();
        assert!(rendered.contains("outer"));
        assert!(rendered.contains("inner"));
        assert!(ctx.suggestion.is_none());
    }

    #[test]
    fn test_display_includes_details_and_suggestion() {
        let ctx = ErrorContext::new(UpdaterError::NoReleaseAvailable)
            .with_details("manifest was empty")
            .with_suggestion("try again");

        assert_eq!(
            ctx.to_string(),
            "The release manifest does not contain an installable release\nDetails: manifest was empty\nSuggestion: try again"
        );
    }
}

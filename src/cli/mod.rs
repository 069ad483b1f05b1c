//! Command-line interface for the Aerial updater.
//!
//! The updater has no subcommands. A bare invocation starts the interactive
//! (menu) mode; `--silent` is what the periodic launch agent passes.
//!
//! # Global Options
//!
//! - `--silent` - Check for updates unattended and exit when there is nothing to do
//! - `--verbose` - Enable debug output
//! - `--quiet` - Only log warnings and errors
//! - `--config <PATH>` - Use an alternate preferences file
//!
//! # Examples
//!
//! ```bash
//! aerial-updater                 # Menu mode
//! aerial-updater --silent        # Launch agent run
//! aerial-updater --silent -v     # Launch agent run with debug logs
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::{Preferences, cache_dir_for, resolve_config_path};
use crate::lifecycle::{LaunchOutcome, LifecycleController, SystemWideInstall};
use crate::presentation::TerminalUi;
use crate::update::AerialUpdateService;


/// Runtime settings derived from the command line.
///
/// Kept separate from [`Cli`] so tests can build one without parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Default log filter, used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Custom preferences file location.
    pub config_path: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            config_path: None,
        }
    }
}

impl CliConfig {
    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// `RUST_LOG` takes precedence over [`CliConfig::log_level`]. Calling this
    /// more than once is harmless.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Background updater for the Aerial screen saver.
#[derive(Parser, Debug)]
#[command(
    name = "aerial-updater",
    about = "Background updater for the Aerial screen saver",
    version,
    author,
    long_about = "Keeps the Aerial screen saver up to date. Run without arguments for the menu, or with --silent from a launch agent."
)]
pub struct Cli {
    /// Check for updates unattended.
    ///
    /// Installs automatically when the update mode is "automatic", otherwise
    /// stays resident with a notification. With nothing to do, waits briefly
    /// and exits.
    #[arg(long)]
    pub silent: bool,

    /// Enable debug output.
    ///
    /// Equivalent to `RUST_LOG=debug`. Mutually exclusive with `--quiet`.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,

    /// Path to the preferences file.
    ///
    /// Overrides `~/.aerial-updater/config.toml` and the
    /// `AERIAL_UPDATER_CONFIG_PATH` environment variable.
    ///
    /// ```bash
    /// aerial-updater --config ./dev-config.toml
    /// ```
    #[arg(short, long)]
    config: Option<String>,
}

impl Cli {
    /// Translate the parsed flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        };

        CliConfig {
            log_level: log_level.to_string(),
            config_path: self.config.clone(),
        }
    }

    /// Set up logging and run one launch with the raw process arguments.
    pub async fn execute(self, args: &[String]) -> Result<LaunchOutcome> {
        let config = self.build_config();
        config.init_logging();
        Self::execute_with_config(args, config).await
    }

    /// Run one launch: load preferences, wire the default collaborators,
    /// drive the controller and keep the process alive while resident.
    pub async fn execute_with_config(args: &[String], config: CliConfig) -> Result<LaunchOutcome> {
        info!(
            "Aerial Updater {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        );

        let config_path = resolve_config_path(config.config_path.as_deref())?;
        let preferences = Preferences::load_with_optional(Some(config_path.clone())).await?;
        let settings = preferences.updater.clone();

        let service = AerialUpdateService::new(&settings, cache_dir_for(&config_path))?;
        let detector = SystemWideInstall::new(settings.system_install_path());
        let (bridge, ui) = TerminalUi::spawn(preferences.clone(), config_path);

        let mut controller = LifecycleController::new(&service, &bridge, &preferences, &detector)
            .with_exit_delay(settings.silent_exit_delay());
        if let Ok(exe) = std::env::current_exe() {
            controller = controller.with_executable_path(exe);
        }

        let outcome = controller.launch(args).await;

        match outcome {
            LaunchOutcome::Resident | LaunchOutcome::FirstRunSetup => {
                tokio::signal::ctrl_c()
                    .await
                    .context("Failed to listen for Ctrl-C")?;
                info!("Shutting down");
                ui.abort();
            }
            LaunchOutcome::Terminate(_) => {
                drop(bridge);
                if let Err(e) = ui.await {
                    debug!("UI task ended abnormally: {e}");
                }
            }
        }

        Ok(outcome)
    }
}

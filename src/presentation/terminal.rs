use anyhow::Result;
use colored::Colorize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{Preferences, UpdateMode};
use crate::presentation::{IconState, PresentationBridge};

/// Messages handled by the task that owns the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMessage {
    /// Update the status indicator.
    SetIcon(IconState),
    /// Render the resident menu.
    BuildMenu,
    /// Run first-run setup, then render the menu.
    FirstRunSetup,
}

/// [`PresentationBridge`] for terminal sessions.
///
/// Icon, menu and setup requests are queued to [`TerminalUi`]; blocking
/// choices and alerts are handled inline because the caller has to wait for
/// them anyway. The stdin read of a choice is moved off the async worker so
/// other tasks keep running while the prompt is open.
pub struct TerminalBridge {
    tx: mpsc::UnboundedSender<UiMessage>,
}

impl TerminalBridge {
    /// Bridge feeding `tx`.
    pub fn new(tx: mpsc::UnboundedSender<UiMessage>) -> Self {
        Self { tx }
    }

    fn send(&self, message: UiMessage) {
        if self.tx.send(message).is_err() {
            debug!("UI task has stopped, dropping message");
        }
    }
}

impl PresentationBridge for TerminalBridge {
    fn set_icon(&self, state: IconState) {
        self.send(UiMessage::SetIcon(state));
    }

    fn show_blocking_choice(&self, message: &str, option_a: &str, option_b: &str) -> bool {
        run_blocking(|| {
            prompt_choice(std::io::stdin().lock(), std::io::stderr(), message, option_a, option_b)
        })
    }

    fn reveal_file(&self, path: &Path) {
        let target = path.parent().unwrap_or(path);
        eprintln!("{} {}", "Opening".cyan(), target.display());
        if let Err(e) = open::that(target) {
            warn!("Could not open {}: {}", target.display(), e);
        }
    }

    fn show_error_alert(&self, title: &str, text: &str) {
        eprintln!("{}: {}", title.red().bold(), text);
    }

    fn present_first_run_setup(&self) {
        self.send(UiMessage::FirstRunSetup);
    }

    fn build_menu(&self) {
        self.send(UiMessage::BuildMenu);
    }
}

/// Run `f`, which blocks on the terminal, without stalling the runtime.
///
/// On a multi-threaded runtime the current worker hands its other tasks off
/// first. `block_in_place` panics on a current-thread runtime, so there (and
/// outside any runtime) `f` simply runs inline.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Ask `message` on `output` until `input` yields a valid answer.
///
/// Returns `false` (`option_b`) when `input` is closed or unreadable.
fn prompt_choice<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    message: &str,
    option_a: &str,
    option_b: &str,
) -> bool {
    loop {
        let _ = writeln!(output, "\n{message}");
        let _ = write!(output, "[1] {option_a}  [2] {option_b}: ");
        let _ = output.flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            // No terminal to answer from: take the safe exit.
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }

        if let Some(choice) = parse_choice(&line, option_a, option_b) {
            return choice;
        }
    }
}

/// Interpret an answer to a two-option prompt.
///
/// Accepts the option number or the option label, case-insensitively.
pub fn parse_choice(answer: &str, option_a: &str, option_b: &str) -> Option<bool> {
    let answer = answer.trim();
    if answer == "1" || answer.eq_ignore_ascii_case(option_a) {
        Some(true)
    } else if answer == "2" || answer.eq_ignore_ascii_case(option_b) {
        Some(false)
    } else {
        None
    }
}

/// Interpret the first-run answer to "install updates automatically?".
pub fn parse_update_mode(answer: &str) -> Option<UpdateMode> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" | "y" | "yes" | "a" | "automatic" => Some(UpdateMode::Automatic),
        "n" | "no" | "m" | "manual" => Some(UpdateMode::Manual),
        _ => None,
    }
}

fn icon_label(state: IconState) -> String {
    match state {
        IconState::Normal => "[aerial]".normal().to_string(),
        IconState::Updating => "[aerial ...]".dimmed().to_string(),
        IconState::Notification => "[aerial !]".yellow().bold().to_string(),
    }
}

/// Text of the resident menu for the given state.
pub fn render_menu(icon: IconState, preferences: &Preferences) -> String {
    let mode = match preferences.update_mode {
        UpdateMode::Automatic => "automatic",
        UpdateMode::Manual => "manual",
    };
    let status = match icon {
        IconState::Normal => "Aerial is up to date",
        IconState::Updating => "Installing update",
        IconState::Notification => "An update is available",
    };

    format!(
        "{} Aerial Updater {}\n  {}\n  Update mode: {}\n  Install path: {}\n  Press Ctrl-C to quit",
        icon_label(icon),
        env!("CARGO_PKG_VERSION"),
        status,
        mode,
        preferences.updater.install_path().display()
    )
}

/// Task owning the terminal: applies icon changes, renders the menu and
/// drives first-run setup.
pub struct TerminalUi {
    rx: mpsc::UnboundedReceiver<UiMessage>,
    preferences: Preferences,
    config_path: PathBuf,
    icon: IconState,
}

impl TerminalUi {
    /// Spawn the UI task and return the bridge feeding it.
    pub fn spawn(preferences: Preferences, config_path: PathBuf) -> (TerminalBridge, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ui = Self {
            rx,
            preferences,
            config_path,
            icon: IconState::Normal,
        };
        (TerminalBridge::new(tx), tokio::spawn(ui.run()))
    }

    async fn run(mut self) {
        while let Some(message) = self.rx.recv().await {
            match message {
                UiMessage::SetIcon(state) => {
                    debug!("Icon -> {:?}", state);
                    self.icon = state;
                }
                UiMessage::BuildMenu => self.show_menu(),
                UiMessage::FirstRunSetup => {
                    if let Err(e) = self.first_run_setup().await {
                        warn!("First-run setup failed: {e:#}");
                    }
                    self.show_menu();
                }
            }
        }
    }

    fn show_menu(&self) {
        println!("{}", render_menu(self.icon, &self.preferences));
    }

    async fn first_run_setup(&mut self) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        self.run_setup(BufReader::new(tokio::io::stdin()), &mut stdout)
            .await
    }

    /// Ask for the update mode on `input` and save it.
    ///
    /// Closed input leaves the preferences untouched, so setup runs again on
    /// the next launch.
    async fn run_setup<R, W>(&mut self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        output
            .write_all(
                format!(
                    "{}\nAerial Updater keeps {} current.\n",
                    "Welcome to Aerial Updater".bold(),
                    self.preferences.updater.install_path().display()
                )
                .as_bytes(),
            )
            .await?;

        let mode = loop {
            output
                .write_all(b"Install updates automatically? [Y/n] ")
                .await?;
            output.flush().await?;

            match lines.next_line().await? {
                Some(answer) => {
                    if let Some(mode) = parse_update_mode(&answer) {
                        break mode;
                    }
                }
                None => {
                    info!("No answer to first-run setup, it stays pending");
                    output.write_all(b"\n").await?;
                    return Ok(());
                }
            }
        };

        self.preferences.update_mode = mode;
        self.preferences.first_time_setup = true;
        self.preferences.save_to(&self.config_path).await?;

        output
            .write_all(format!("{}\n", "Setup complete".green()).as_bytes())
            .await?;
        Ok(())
    }
}

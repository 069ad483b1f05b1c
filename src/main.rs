//! Aerial Updater entry point
//!
//! Parses the command line, runs one launch and turns the outcome into a
//! process exit. Errors are shown with suggestions and exit with status 1.

use aerial_updater::cli::Cli;
use aerial_updater::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let cli = Cli::parse_from(&args);

    match cli.execute(&args).await {
        Ok(_) => std::process::exit(0),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}

//! Entry point for revue, a plan-first code review agent for the terminal.
//!
//! This binary loads environment variables, parses CLI arguments via [`cli`],
//! installs logging, and dispatches to the appropriate subcommand handler.

mod agent;
mod chat;
mod cli;
mod config;
mod constants;
mod error;
mod format;
mod logging;
mod message;
mod output;
mod provider;
mod session;
mod todo;
mod tools;

use anyhow::Result;

/// Runs the revue CLI.
///
/// Loads `.env` files (silently ignored if absent), parses command-line
/// arguments into a [`cli::Cli`] struct, and dispatches the chosen
/// subcommand via [`cli::run`].
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();
    logging::init(cli.verbose);
    cli::run(cli).await
}

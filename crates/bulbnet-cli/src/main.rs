//! bulbnet CLI - find lights on the local network from the terminal.
//!
//! Runs one-shot or continuous discovery and prints what answered, as a table
//! or as JSON for scripts.

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bulbnet_core::config::DiscoveryConfig;

use cli::{Cli, Commands};
use error::{exit_codes, CliError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    // `config init` may target a file that does not exist yet.
    let config = match (&cli.command, cli.config.as_deref()) {
        (Commands::Config(_), Some(path)) if !tokio::fs::try_exists(path).await.unwrap_or(false) => {
            DiscoveryConfig::default()
        }
        (_, path) => DiscoveryConfig::load_or_default(path).await?,
    };
    tracing::debug!(?config, "using discovery config");

    match cli.command {
        Commands::Discover(args) => commands::run_discover(args, config, cli.json).await,
        Commands::Targets => commands::run_targets(&config, cli.json),
        Commands::Config(args) => {
            commands::run_config(args, &config, cli.config.as_deref(), cli.json).await
        }
    }
}

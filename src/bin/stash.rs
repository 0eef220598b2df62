//! Stash CLI Binary
//!
//! Command-line interface for the private file store.

use anyhow::Context;
use clap::Parser;
use stash::config::StashConfig;
use stash::logging::init_logging;
use stash::tooling::cli::{Cli, CliContext};
use std::process;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config =
        StashConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let mut logging = config.logging.clone();
    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }
    init_logging(Some(&logging)).context("failed to initialize logging")?;

    // Open the store
    let context = match CliContext::new(cli.root.clone(), cli.config.clone()).await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error opening store: {}", e);
            process::exit(1);
        }
    };

    // Execute command
    match context.execute(&cli.command).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

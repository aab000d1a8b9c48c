//! Spoticizr - PKCE login and token relay
//!
//! Main entry point for the `spoticizr` binary.

use anyhow::Context;
use clap::Parser;
use spoticizr_api::utils::logging::init_tracing;
use spoticizr_api::Cli;
use spoticizr_infra::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json, &cli.log_level)?;

    let config = match &cli.config {
        Some(path) => config::load_from_file(Some(path.clone())),
        None => config::load(),
    }
    .context("failed to load configuration")?;

    let output = spoticizr_api::run(&cli.command, config)
        .await
        .with_context(|| format!("{} failed", cli.command.name()))?;

    #[allow(clippy::print_stdout)]
    {
        println!("{output}");
    }
    Ok(())
}

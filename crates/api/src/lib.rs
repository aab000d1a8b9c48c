//! # Spoticizr CLI
//!
//! Terminal host for the auth core - commands and main entry point.
//!
//! This crate contains:
//! - The `clap` command-line definition
//! - Application context (dependency injection)
//! - One module per subcommand
//!
//! ## Architecture
//! - Depends on `domain`, `common`, and `infra`
//! - Wires the auth session to file storage, the relay client and the
//!   loopback redirect receiver

pub mod cli;
pub mod commands;
pub mod context;
pub mod utils;

use std::time::{Duration, Instant};

use spoticizr_domain::{Config, Result};
use tracing::info;

pub use cli::{Cli, Command};
pub use context::{AppContext, Session, TerminalNavigator};

use crate::utils::logging::log_command_execution;

/// Execute `command` against `config` and return its stdout output
///
/// # Errors
/// Returns the command's error after logging it.
pub async fn run(command: &Command, config: Config) -> Result<String> {
    let name = command.name();
    let start = Instant::now();
    info!(command = name, "Executing command");

    let result = dispatch(command, config).await;

    log_command_execution(name, start.elapsed(), result.as_ref().err());
    result
}

async fn dispatch(command: &Command, config: Config) -> Result<String> {
    if matches!(command, Command::Relay) {
        return commands::relay::run(&config).await;
    }

    let ctx = AppContext::new(config)?;
    let result = run_in_context(command, &ctx).await;
    ctx.shutdown().await;
    result
}

async fn run_in_context(command: &Command, ctx: &AppContext) -> Result<String> {
    match command {
        Command::Relay => commands::relay::run(&ctx.config).await,
        Command::Login { timeout } => {
            commands::login::run(ctx, Duration::from_secs(*timeout)).await
        }
        Command::Token => commands::token::run(ctx).await,
        Command::Status => commands::status::run(ctx).await,
        Command::Logout => commands::logout::run(ctx),
        Command::Me => commands::me::run(ctx).await,
    }
}

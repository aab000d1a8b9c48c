//! Command-line interface definition

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// PKCE login, token renewal and relay for the listening dashboard
#[derive(Debug, Parser)]
#[command(name = "spoticizr", version, about)]
pub struct Cli {
    /// Load configuration from this TOML/JSON file instead of the environment
    #[arg(long, short = 'c', global = true, env = "SPOTICIZR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "SPOTICIZR_LOG_JSON")]
    pub log_json: bool,

    /// Default log level when `RUST_LOG` is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the token relay until interrupted
    Relay,

    /// Sign in through the provider and store the session
    Login {
        /// Seconds to wait for the authorization redirect
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },

    /// Print a valid access token, refreshing it first if needed
    Token,

    /// Show whether a session is stored and when it expires
    Status,

    /// Forget the stored session
    Logout,

    /// Fetch the signed-in user's profile from the Web API
    Me,
}

impl Command {
    /// Stable name used in logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Relay => "relay",
            Self::Login { .. } => "login",
            Self::Token => "token",
            Self::Status => "status",
            Self::Logout => "logout",
            Self::Me => "me",
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_login_timeout_and_global_flags() {
        let cli =
            Cli::try_parse_from(["spoticizr", "login", "--timeout", "30", "--log-json"]).unwrap();

        assert!(cli.log_json);
        assert!(matches!(cli.command, Command::Login { timeout: 30 }));
        assert_eq!(cli.command.name(), "login");
    }

    #[test]
    fn config_path_is_optional() {
        let cli = Cli::try_parse_from(["spoticizr", "-c", "spoticizr.toml", "status"]).unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("spoticizr.toml")));
        assert!(matches!(cli.command, Command::Status));
    }
}

use std::time::Duration;

use spoticizr_domain::SpoticizrError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG` and falls back to `default_level`. Logs go to stderr so
/// command output on stdout stays machine-readable.
///
/// # Errors
/// Returns error if a global subscriber is already installed.
pub fn init_tracing(json: bool, default_level: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if json { builder.json().try_init() } else { builder.try_init() };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// Log the outcome of a command execution with structured fields.
///
/// `command` should be a stable identifier (e.g. `"login"`); never pass
/// token material through it.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error: Option<&SpoticizrError>) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match error {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(err) => {
            warn!(command, duration_ms, error_type = err.label(), "command_execution_failure");
        }
    }
}

//! `spoticizr relay`

use spoticizr_domain::{Config, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Serve the token relay until Ctrl-C
///
/// # Errors
/// Returns error if the relay cannot bind or stops abnormally.
pub async fn run(config: &Config) -> Result<String> {
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received; stopping relay"),
            Err(err) => warn!(error = %err, "Failed to listen for interrupt; stopping relay"),
        }
        trigger.cancel();
    });

    spoticizr_infra::relay::serve(config, shutdown).await?;
    Ok("Relay stopped.".to_string())
}

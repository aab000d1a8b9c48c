//! `spoticizr me`

use spoticizr_domain::{Result, SpoticizrError};
use spoticizr_infra::SpotifyApiClient;

use crate::context::AppContext;

/// Fetch `/v1/me` with the stored session
///
/// # Errors
/// Returns `Auth` when signed out or when the API rejected a freshly
/// refreshed token (the session is cleared then).
pub async fn run(ctx: &AppContext) -> Result<String> {
    ctx.start().await?;
    let client = SpotifyApiClient::new(&ctx.config, ctx.session.clone())?;
    let profile = client.me().await?;
    serde_json::to_string_pretty(&profile)
        .map_err(|e| SpoticizrError::Internal(format!("failed to render profile: {e}")))
}

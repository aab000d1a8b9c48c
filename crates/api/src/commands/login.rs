//! `spoticizr login`
//!
//! Binds the loopback redirect receiver before the authorize URL is shown,
//! so the provider's redirect always finds a listener.

use std::time::Duration;

use spoticizr_common::auth::CallbackOutcome;
use spoticizr_domain::{Result, SpoticizrError};
use spoticizr_infra::errors::{map_auth_session_error, map_callback_rejection};
use spoticizr_infra::RedirectReceiver;
use tracing::{debug, info};

use crate::context::AppContext;

/// Run the interactive login
///
/// An already valid session short-circuits to the dashboard without
/// contacting the provider.
///
/// # Errors
/// Returns error if the redirect never arrives within `wait`, carries a
/// provider error, fails state validation, or the code exchange fails.
pub async fn run(ctx: &AppContext, wait: Duration) -> Result<String> {
    ctx.start().await?;
    if ctx.session.on_login_surface() {
        return Ok("Already signed in.".to_string());
    }

    let mut receiver = RedirectReceiver::bind(&ctx.config.redirect_uri).await?;
    let request = ctx.session.begin_login().map_err(map_auth_session_error)?;
    debug!(
        state_len = request.state.len(),
        listen = %receiver.local_addr(),
        "Authorization request issued"
    );

    let redirect = receiver.wait(wait).await;
    receiver.shutdown().await?;

    match ctx.session.handle_redirect(redirect?).await {
        CallbackOutcome::Succeeded(tokens) => {
            info!(expires_at = %tokens.expires_at, "Login complete");
            Ok(format!("Signed in. Access token valid until {}.", tokens.expires_at.to_rfc3339()))
        }
        CallbackOutcome::Failed(rejection) => Err(map_callback_rejection(rejection)),
        CallbackOutcome::NoCallbackParams => Err(SpoticizrError::Auth(
            "redirect carried no authorization parameters".to_string(),
        )),
    }
}

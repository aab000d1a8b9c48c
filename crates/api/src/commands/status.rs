//! `spoticizr status`

use std::fmt::Write;

use spoticizr_common::time::{Clock, SystemClock};
use spoticizr_domain::Result;

use crate::context::AppContext;

/// Describe the stored session without printing any token material
///
/// # Errors
/// Returns error if persisted state cannot be read.
pub async fn run(ctx: &AppContext) -> Result<String> {
    let active = ctx.start().await?;
    let Some(tokens) = ctx.session.token_set().filter(|_| active) else {
        return Ok("Not signed in.".to_string());
    };

    let mut out = String::from("Signed in.\n");
    let remaining = tokens.seconds_until_expiry(SystemClock.now()).max(0);
    let _ = writeln!(
        out,
        "Access token expires: {} (in {remaining}s)",
        tokens.expires_at.to_rfc3339()
    );
    let _ = writeln!(
        out,
        "Refresh token: {}",
        if tokens.refresh_token.is_some() { "present" } else { "absent" }
    );
    if let Some(scope) = tokens.scope.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "Scopes: {scope}");
    }
    if let Some(deadline) = ctx.session.token_manager().armed_deadline() {
        let _ = writeln!(out, "Next renewal: {}", deadline.to_rfc3339());
    }
    Ok(out.trim_end().to_string())
}

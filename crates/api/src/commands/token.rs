//! `spoticizr token`

use spoticizr_domain::Result;
use spoticizr_infra::errors::map_auth_session_error;

use crate::context::AppContext;

/// Print a usable access token, refreshing first if it is about to expire
///
/// # Errors
/// Returns `Auth` when signed out or when the refresh failed (the session
/// is cleared then).
pub async fn run(ctx: &AppContext) -> Result<String> {
    ctx.start().await?;
    ctx.session.valid_token().await.map_err(map_auth_session_error)
}

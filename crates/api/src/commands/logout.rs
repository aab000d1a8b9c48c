//! `spoticizr logout`

use spoticizr_domain::Result;
use spoticizr_infra::errors::map_auth_session_error;

use crate::context::AppContext;

/// Clear the stored session; safe to run when already signed out
///
/// # Errors
/// Returns error if the state file cannot be rewritten.
pub fn run(ctx: &AppContext) -> Result<String> {
    ctx.session.logout().map_err(map_auth_session_error)?;
    Ok("Signed out.".to_string())
}

//! Access tokens for the Web API client
//!
//! The client only sees [`AccessTokenProvider`]; the real implementation is
//! the auth session, which refreshes through the relay and logs out when a
//! refresh fails.

use async_trait::async_trait;
use spoticizr_common::auth::{
    AuthSession, AuthSessionError, ClientStorage, RelayClientTrait, TokenManagerError,
};
use tracing::debug;

use super::errors::ApiError;

/// Trait for providing access tokens
///
/// This trait allows dependency injection and testing with mock providers.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A usable access token, refreshed first if it is about to expire
    async fn access_token(&self) -> Result<String, ApiError>;

    /// The upstream answered 401 for `rejected`; return a token worth one
    /// more attempt
    async fn token_rejected(&self, rejected: &str) -> Result<String, ApiError>;

    /// Drop the session after a refreshed token was rejected too
    fn revoke(&self) -> Result<(), ApiError>;
}

#[async_trait]
impl<R, S> AccessTokenProvider for AuthSession<R, S>
where
    R: RelayClientTrait + 'static,
    S: ClientStorage + 'static,
{
    async fn access_token(&self) -> Result<String, ApiError> {
        self.valid_token().await.map_err(session_error)
    }

    async fn token_rejected(&self, rejected: &str) -> Result<String, ApiError> {
        self.handle_unauthorized(rejected).await.map_err(session_error)
    }

    fn revoke(&self) -> Result<(), ApiError> {
        debug!("Revoking session after repeated 401");
        self.logout().map_err(session_error)
    }
}

fn session_error(err: AuthSessionError) -> ApiError {
    match err {
        AuthSessionError::TokenManager(TokenManagerError::NotAuthenticated) => {
            ApiError::Auth("not signed in".to_string())
        }
        AuthSessionError::TokenManager(TokenManagerError::Storage(e)) => {
            ApiError::Client(format!("session storage failed: {e}"))
        }
        other => ApiError::Auth(other.to_string()),
    }
}

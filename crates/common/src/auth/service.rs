//! Session orchestrator
//!
//! Combines the authorization builder, callback handler, token manager and
//! renewal scheduler into one object that hosts create once and inject
//! wherever a token is needed.

use std::sync::Arc;

use parking_lot::Mutex;
use spoticizr_domain::Config;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::authorize::{AuthorizationBuilder, AuthorizeError};
use super::callback::{CallbackHandler, CallbackOutcome};
use super::token_manager::{TokenManager, TokenManagerError};
use super::traits::{ClientStorage, Navigator, RelayClientTrait};
use super::types::{AuthorizationRedirect, AuthorizationRequest, TokenSet};
use crate::time::Clock;

/// Error type for session operations
#[derive(Debug, Error)]
pub enum AuthSessionError {
    #[error("Authorization request failed: {0}")]
    Authorize(#[from] AuthorizeError),

    #[error("Token manager error: {0}")]
    TokenManager(#[from] TokenManagerError),
}

/// One authenticated (or not yet authenticated) user session
///
/// Owns the scheduler task; dropping the session or calling
/// [`AuthSession::shutdown`] stops it.
pub struct AuthSession<R: RelayClientTrait + 'static, S: ClientStorage + 'static> {
    builder: AuthorizationBuilder<S>,
    callback: CallbackHandler<R, S>,
    tokens: Arc<TokenManager<R, S>>,
    shutdown: CancellationToken,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl<R: RelayClientTrait + 'static, S: ClientStorage + 'static> AuthSession<R, S> {
    /// Wire a session from its collaborators
    ///
    /// The renewal margin is taken from `config.client`.
    #[must_use]
    pub fn new(
        config: Config,
        relay: Arc<R>,
        storage: Arc<S>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tokens = Arc::new(TokenManager::new(
            relay.clone(),
            storage.clone(),
            navigator.clone(),
            clock.clone(),
            config.client.refresh_margin(),
        ));
        let callback = CallbackHandler::new(
            relay,
            storage.clone(),
            tokens.clone(),
            navigator.clone(),
            clock,
        );
        let builder = AuthorizationBuilder::new(config, storage, navigator);

        Self {
            builder,
            callback,
            tokens,
            shutdown: CancellationToken::new(),
            scheduler: Mutex::new(None),
        }
    }

    /// Restore any persisted session and start the renewal scheduler
    ///
    /// Must be called from within a tokio runtime. Returns whether a usable
    /// session is active.
    ///
    /// # Errors
    /// Returns error if persisted state cannot be read.
    pub async fn start(&self) -> Result<bool, AuthSessionError> {
        let active = self.tokens.initialize().await?;

        {
            let mut scheduler = self.scheduler.lock();
            if scheduler.is_none() {
                let tokens = self.tokens.clone();
                *scheduler = Some(tokio::spawn(tokens.run_auto_refresh(self.shutdown.clone())));
            }
        }

        info!(active, "Auth session started");
        Ok(active)
    }

    /// Begin a login attempt (see [`AuthorizationBuilder::begin`])
    ///
    /// # Errors
    /// Returns error on missing configuration, RNG or storage failure.
    pub fn begin_login(&self) -> Result<AuthorizationRequest, AuthSessionError> {
        Ok(self.builder.begin()?)
    }

    /// Feed a provider redirect to the callback state machine
    pub async fn handle_redirect(&self, redirect: AuthorizationRedirect) -> CallbackOutcome {
        self.callback.handle(redirect).await
    }

    /// Login surface check; returns whether the user was sent to the
    /// dashboard
    pub fn on_login_surface(&self) -> bool {
        self.callback.on_login_surface()
    }

    /// Current access token (synchronous, never stale)
    #[must_use]
    pub fn current_token(&self) -> Option<String> {
        self.tokens.current_token()
    }

    /// Usable access token, refreshing first if needed
    ///
    /// # Errors
    /// Returns error if not authenticated or the refresh failed.
    pub async fn valid_token(&self) -> Result<String, AuthSessionError> {
        Ok(self.tokens.valid_token().await?)
    }

    /// Upstream answered 401 for `rejected`
    ///
    /// # Errors
    /// Returns error if the refresh failed; the session is logged out then.
    pub async fn handle_unauthorized(&self, rejected: &str) -> Result<String, AuthSessionError> {
        Ok(self.tokens.handle_unauthorized(rejected).await?)
    }

    /// Snapshot of the held token set
    #[must_use]
    pub fn token_set(&self) -> Option<TokenSet> {
        self.tokens.token_set()
    }

    /// Log out (idempotent, no network call)
    ///
    /// # Errors
    /// Returns error if persisted keys could not be removed.
    pub fn logout(&self) -> Result<(), AuthSessionError> {
        Ok(self.tokens.logout()?)
    }

    /// Get token manager for advanced operations
    #[must_use]
    pub fn token_manager(&self) -> Arc<TokenManager<R, S>> {
        self.tokens.clone()
    }

    /// Stop the renewal scheduler and wait for it to exit
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.scheduler.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl<R: RelayClientTrait + 'static, S: ClientStorage + 'static> Drop for AuthSession<R, S> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl<R: RelayClientTrait + 'static, S: ClientStorage + 'static> std::fmt::Debug
    for AuthSession<R, S>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("authenticated", &self.tokens.is_authenticated())
            .field("armed_deadline", &self.tokens.armed_deadline())
            .finish()
    }
}

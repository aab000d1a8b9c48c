//! Callback handler state machine
//!
//! Fed one [`AuthorizationRedirect`] per provider redirect. The state check
//! always completes before any exchange request, and a pending
//! authorization is consumed at most once.
//!
//! ```text
//! NoCallbackParams        (no code, no state: nothing to do)
//! ValidatingState ──┬──► Exchanging ──┬──► Succeeded
//!                   │                 └──► Failed
//!                   └──► Failed
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::pkce::validate_state;
use super::storage::{clear_pending, load_pending};
use super::token_manager::TokenManager;
use super::traits::{ClientStorage, Navigator, RelayClientTrait, Route};
use super::types::{AuthorizationRedirect, TokenSet};
use crate::time::Clock;

/// Phase of the most recent callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackPhase {
    Idle,
    NoCallbackParams,
    ValidatingState,
    Exchanging,
    Succeeded,
    Failed,
}

/// Why a callback ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackRejection {
    /// The provider redirected with `?error=...`
    ProviderError(String),
    /// Only one of `code` / `state` was present
    MalformedCallback,
    /// No login attempt is waiting (never started, or already consumed)
    NoPendingAuthorization,
    /// Returned state differs from the stored one
    StateMismatch,
    /// Relay non-2xx, network error or timeout
    ExchangeFailed(String),
    /// Tokens were issued but could not be stored
    StorageFailed(String),
}

impl fmt::Display for CallbackRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderError(e) => write!(f, "authorization denied by provider: {e}"),
            Self::MalformedCallback => write!(f, "callback is missing code or state"),
            Self::NoPendingAuthorization => write!(f, "no login attempt in progress"),
            Self::StateMismatch => write!(f, "state mismatch"),
            Self::ExchangeFailed(e) => write!(f, "token exchange failed: {e}"),
            Self::StorageFailed(e) => write!(f, "could not store tokens: {e}"),
        }
    }
}

/// Terminal result of handling one redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Not a callback; nothing happened
    NoCallbackParams,
    /// Session established and the user sent to the dashboard
    Succeeded(TokenSet),
    /// No session created; the user stays on the login surface
    Failed(CallbackRejection),
}

impl CallbackOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

pub struct CallbackHandler<R: RelayClientTrait + 'static, S: ClientStorage + 'static> {
    relay: Arc<R>,
    storage: Arc<S>,
    tokens: Arc<TokenManager<R, S>>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    phase: Mutex<CallbackPhase>,
}

impl<R: RelayClientTrait + 'static, S: ClientStorage + 'static> CallbackHandler<R, S> {
    #[must_use]
    pub fn new(
        relay: Arc<R>,
        storage: Arc<S>,
        tokens: Arc<TokenManager<R, S>>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { relay, storage, tokens, navigator, clock, phase: Mutex::new(CallbackPhase::Idle) }
    }

    /// Phase reached by the most recent [`CallbackHandler::handle`] call
    #[must_use]
    pub fn phase(&self) -> CallbackPhase {
        *self.phase.lock()
    }

    /// Run the state machine for one redirect
    ///
    /// Failures are reported in the outcome, never as panics or errors.
    pub async fn handle(&self, redirect: AuthorizationRedirect) -> CallbackOutcome {
        if let Some(error) = redirect.error {
            warn!(error = %error, "Provider redirected with an error");
            return self.fail(CallbackRejection::ProviderError(error));
        }

        let (code, state) = match (redirect.code, redirect.state) {
            (None, None) => {
                self.enter(CallbackPhase::NoCallbackParams);
                return CallbackOutcome::NoCallbackParams;
            }
            (Some(code), Some(state)) => (code, state),
            _ => return self.fail(CallbackRejection::MalformedCallback),
        };

        self.enter(CallbackPhase::ValidatingState);
        let pending = match load_pending(&*self.storage) {
            Ok(Some(pending)) => pending,
            Ok(None) => return self.fail(CallbackRejection::NoPendingAuthorization),
            Err(e) => return self.fail(CallbackRejection::StorageFailed(e.to_string())),
        };

        if !validate_state(&pending.state, &state) {
            warn!("Callback state does not match the pending authorization; possible CSRF");
            return self.fail(CallbackRejection::StateMismatch);
        }

        // Consume before exchanging so a replayed redirect finds nothing.
        if let Err(e) = clear_pending(&*self.storage) {
            return self.fail(CallbackRejection::StorageFailed(e.to_string()));
        }

        self.enter(CallbackPhase::Exchanging);
        let response = match self.relay.exchange_code(&code, &pending.code_verifier).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Authorization code exchange failed");
                return self.fail(CallbackRejection::ExchangeFailed(e.to_string()));
            }
        };

        let tokens = TokenSet::from_response(response, self.clock.now());
        if let Err(e) = self.tokens.adopt(tokens.clone()) {
            return self.fail(CallbackRejection::StorageFailed(e.to_string()));
        }

        self.enter(CallbackPhase::Succeeded);
        info!(expires_at = %tokens.expires_at, "Login completed");
        self.navigator.navigate(Route::Dashboard);
        CallbackOutcome::Succeeded(tokens)
    }

    /// Login surface check: skip straight to the dashboard with a valid token
    ///
    /// Returns whether navigation happened.
    pub fn on_login_surface(&self) -> bool {
        if self.tokens.current_token().is_some() {
            info!("Valid session found on login surface; redirecting to dashboard");
            self.navigator.navigate(Route::Dashboard);
            return true;
        }
        false
    }

    fn enter(&self, phase: CallbackPhase) {
        let mut current = self.phase.lock();
        debug!(from = ?*current, to = ?phase, "Callback phase transition");
        *current = phase;
    }

    fn fail(&self, rejection: CallbackRejection) -> CallbackOutcome {
        self.enter(CallbackPhase::Failed);
        warn!(reason = %rejection, "Login failed");
        CallbackOutcome::Failed(rejection)
    }
}

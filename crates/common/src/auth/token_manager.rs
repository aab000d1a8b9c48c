//! Token manager with automatic refresh
//!
//! Manages the OAuth token lifecycle:
//! - Load persisted tokens on startup and decide refresh-or-logout
//! - Hand out the current token to consumers
//! - Renew `margin` before expiry from a long-lived scheduler task
//! - Coalesce concurrent refreshes (timer, 401 handling, accessor)
//! - Tear the session down when a refresh fails

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::client::RelayClientError;
use super::storage::{load_tokens, persist_tokens, StorageError};
use super::teardown::SessionTeardown;
use super::traits::{ClientStorage, Navigator, RelayClientTrait};
use super::types::TokenSet;
use crate::time::Clock;

/// Error type for token manager operations
#[derive(Debug, Error)]
pub enum TokenManagerError {
    /// No tokens available (not authenticated)
    #[error("Not authenticated (no tokens)")]
    NotAuthenticated,

    /// No refresh token available; the session has been logged out
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Relay call failed; the session has been logged out
    #[error("Token refresh failed: {0}")]
    RefreshFailed(#[from] RelayClientError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// What [`TokenManager::install`] did with a token set
enum Installed {
    Adopted,
    /// A logout or another adoption happened first
    Superseded,
    /// The offered expiry is not later than the held one
    NotLater,
}

/// Token manager with auto-refresh capabilities
///
/// Owns the single current [`TokenSet`]. Everyone else reads through
/// [`TokenManager::current_token`] or [`TokenManager::valid_token`].
pub struct TokenManager<R: RelayClientTrait + 'static, S: ClientStorage + 'static> {
    relay: Arc<R>,
    storage: Arc<S>,
    clock: Arc<dyn Clock>,
    teardown: SessionTeardown<S>,
    current_tokens: RwLock<Option<TokenSet>>,
    /// Bumped on every adoption and logout
    generation: AtomicU64,
    refresh_lock: Mutex<()>,
    /// Armed renewal instant; `None` when disarmed
    deadline: watch::Sender<Option<DateTime<Utc>>>,
    refresh_margin: Duration,
}

impl<R: RelayClientTrait + 'static, S: ClientStorage + 'static> TokenManager<R, S> {
    /// Create a new token manager
    ///
    /// # Arguments
    /// * `relay` - Relay client used for refresh
    /// * `storage` - Persistent store for the token keys
    /// * `navigator` - Receives the login route on logout
    /// * `clock` - Wall-clock source for expiry comparisons
    /// * `refresh_margin` - Renew this long before expiry (default 60s)
    #[must_use]
    pub fn new(
        relay: Arc<R>,
        storage: Arc<S>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
        refresh_margin: Duration,
    ) -> Self {
        let (deadline, _) = watch::channel(None);
        Self {
            relay,
            teardown: SessionTeardown::new(storage.clone(), navigator),
            storage,
            clock,
            current_tokens: RwLock::new(None),
            generation: AtomicU64::new(0),
            refresh_lock: Mutex::new(()),
            deadline,
            refresh_margin,
        }
    }

    /// Load persisted tokens and bring the session into a consistent state
    ///
    /// - No persisted token: stays unauthenticated.
    /// - Inside the renewal window (or past expiry): refresh now if a refresh
    ///   token exists, otherwise log out.
    /// - Otherwise: adopt the token and arm the renewal timer.
    ///
    /// Returns whether a usable session is active afterwards.
    ///
    /// # Errors
    /// Returns error only if storage access fails.
    pub async fn initialize(&self) -> Result<bool, TokenManagerError> {
        let Some(tokens) = load_tokens(&*self.storage)? else {
            debug!("No persisted tokens found");
            return Ok(false);
        };

        let now = self.clock.now();
        if !tokens.needs_refresh_at(now, self.refresh_margin) {
            info!(expires_at = %tokens.expires_at, "Restored persisted session");
            self.adopt(tokens)?;
            return Ok(true);
        }

        if tokens.refresh_token.is_none() {
            info!("Persisted token is stale and cannot be renewed; logging out");
            self.logout()?;
            return Ok(false);
        }

        info!("Persisted token is inside the renewal window; refreshing");
        {
            let mut current = self.current_tokens.write();
            *current = Some(tokens);
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        match self.refresh().await {
            Ok(_) => Ok(true),
            Err(TokenManagerError::Storage(e)) => Err(e.into()),
            Err(_) => Ok(false),
        }
    }

    /// Current access token, or `None` if absent or past expiry
    ///
    /// Never returns a stale token. Finding one held past expiry moves the
    /// renewal deadline to now so the scheduler decides refresh-or-logout.
    #[must_use]
    pub fn current_token(&self) -> Option<String> {
        let now = self.clock.now();
        let tokens = self.current_tokens.read();
        let tokens = tokens.as_ref()?;
        if tokens.is_expired_at(now) {
            self.deadline.send_replace(Some(now));
            return None;
        }
        Some(tokens.access_token.clone())
    }

    /// Snapshot of the held token set
    #[must_use]
    pub fn token_set(&self) -> Option<TokenSet> {
        self.current_tokens.read().clone()
    }

    /// Check if a token set is held (valid or not)
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current_tokens.read().is_some()
    }

    /// Currently armed renewal instant
    #[must_use]
    pub fn armed_deadline(&self) -> Option<DateTime<Utc>> {
        *self.deadline.borrow()
    }

    #[must_use]
    pub fn refresh_margin(&self) -> Duration {
        self.refresh_margin
    }

    /// Usable access token, refreshing first if inside the renewal window
    ///
    /// # Errors
    /// - [`TokenManagerError::NotAuthenticated`] without a session.
    /// - Refresh errors; the session has been logged out in that case.
    pub async fn valid_token(&self) -> Result<String, TokenManagerError> {
        let tokens = self.token_set().ok_or(TokenManagerError::NotAuthenticated)?;
        if !tokens.needs_refresh_at(self.clock.now(), self.refresh_margin) {
            return Ok(tokens.access_token);
        }
        Ok(self.refresh().await?.access_token)
    }

    /// React to an upstream 401 for the token `rejected`
    ///
    /// Returns a newer token if one was adopted since `rejected` was handed
    /// out; otherwise forces a (coalesced) refresh.
    ///
    /// # Errors
    /// Same as [`TokenManager::refresh`].
    pub async fn handle_unauthorized(&self, rejected: &str) -> Result<String, TokenManagerError> {
        if let Some(tokens) = self.token_set() {
            if tokens.access_token != rejected && !tokens.is_expired_at(self.clock.now()) {
                debug!("Upstream rejected a superseded token; using the newer one");
                return Ok(tokens.access_token);
            }
        }
        warn!("Upstream rejected the current access token; refreshing");
        Ok(self.refresh().await?.access_token)
    }

    /// Refresh the access token through the relay
    ///
    /// At most one refresh is in flight. A caller that waited while another
    /// refresh adopted a fresh token gets that token without a second relay
    /// call. Failure is not retried: the session is logged out and the error
    /// returned.
    ///
    /// # Errors
    /// - [`TokenManagerError::NotAuthenticated`] without a session.
    /// - [`TokenManagerError::NoRefreshToken`] / [`TokenManagerError::RefreshFailed`]
    ///   after logging out.
    pub async fn refresh(&self) -> Result<TokenSet, TokenManagerError> {
        let observed = self.generation.load(Ordering::SeqCst);
        let _guard = self.refresh_lock.lock().await;

        let current = self.token_set().ok_or(TokenManagerError::NotAuthenticated)?;
        if self.generation.load(Ordering::SeqCst) != observed
            && !current.needs_refresh_at(self.clock.now(), self.refresh_margin)
        {
            debug!("Refresh coalesced with one that just completed");
            return Ok(current);
        }

        let started = self.generation.load(Ordering::SeqCst);
        let Some(refresh_token) = current.refresh_token.clone() else {
            warn!("No refresh token available; logging out");
            self.logout_if(Some(started))?;
            return Err(TokenManagerError::NoRefreshToken);
        };

        match self.relay.refresh(&refresh_token).await {
            Ok(response) => {
                let rotated = response.refresh_token.is_some();
                let renewed = current.renewed(response, self.clock.now());
                match self.install(renewed.clone(), Some(started))? {
                    Installed::Adopted => {
                        info!(expires_at = %renewed.expires_at, rotated, "Access token refreshed");
                        Ok(renewed)
                    }
                    Installed::Superseded => {
                        debug!("Session changed while refreshing; discarding refresh result");
                        self.token_set().ok_or(TokenManagerError::NotAuthenticated)
                    }
                    Installed::NotLater => {
                        warn!(
                            held = %current.expires_at,
                            offered = %renewed.expires_at,
                            "Refresh result does not extend expiry; keeping held token"
                        );
                        Ok(current)
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Token refresh failed; logging out");
                self.logout_if(Some(started))?;
                Err(e.into())
            }
        }
    }

    /// Make `tokens` the current token set, persist it and re-arm the timer
    ///
    /// Used when a login completes; replaces whatever was held.
    ///
    /// # Errors
    /// Returns error if persisting fails.
    pub fn adopt(&self, tokens: TokenSet) -> Result<(), TokenManagerError> {
        self.install(tokens, None).map(|_| ())
    }

    /// Clear the session: in-memory token, renewal timer, persisted keys
    ///
    /// Navigates to the login route. Safe to call repeatedly.
    ///
    /// # Errors
    /// Returns error if the persisted keys could not be removed.
    pub fn logout(&self) -> Result<(), TokenManagerError> {
        self.logout_if(None)
    }

    /// Install `tokens` unless the session changed since `expected_generation`
    ///
    /// A refresh result (`expected_generation` set) must move the expiry
    /// strictly forward; otherwise the held token stays and the next attempt
    /// is armed at its expiry, where any positive lifetime is an improvement.
    ///
    /// The generation only moves under the write lock, so check, persist and
    /// swap are atomic with respect to logout and other adoptions.
    fn install(
        &self,
        tokens: TokenSet,
        expected_generation: Option<u64>,
    ) -> Result<Installed, TokenManagerError> {
        let mut current = self.current_tokens.write();
        if let Some(expected) = expected_generation {
            if expected != self.generation.load(Ordering::SeqCst) {
                return Ok(Installed::Superseded);
            }
            if let Some(held) = current.as_ref().filter(|held| tokens.expires_at <= held.expires_at)
            {
                self.deadline.send_replace(Some(held.expires_at));
                return Ok(Installed::NotLater);
            }
        }

        persist_tokens(&*self.storage, &tokens)?;
        let renew_at = tokens.renew_at(self.refresh_margin);
        *current = Some(tokens);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.deadline.send_replace(Some(renew_at));
        debug!(renew_at = %renew_at, "Renewal timer armed");
        Ok(Installed::Adopted)
    }

    fn logout_if(&self, expected_generation: Option<u64>) -> Result<(), TokenManagerError> {
        let cleared = {
            let mut current = self.current_tokens.write();
            if expected_generation.is_some_and(|g| g != self.generation.load(Ordering::SeqCst)) {
                debug!("Session changed while refreshing; skipping logout");
                return Ok(());
            }
            *current = None;
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.deadline.send_replace(None);
            self.teardown.clear()
        };

        self.teardown.redirect();
        cleared.map_err(Into::into)
    }

    /// Background renewal scheduler
    ///
    /// Sleeps until the armed deadline (no polling), refreshes, and picks up
    /// the re-armed deadline. Re-arming or disarming wakes it early. A
    /// wake-up for a deadline that is no longer armed does nothing. Runs
    /// until `shutdown` is cancelled.
    ///
    /// # Example
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use spoticizr_common::auth::{ClientStorage, RelayClientTrait, TokenManager};
    /// # use tokio_util::sync::CancellationToken;
    /// # fn example<R: RelayClientTrait, S: ClientStorage>(manager: Arc<TokenManager<R, S>>) {
    /// let shutdown = CancellationToken::new();
    /// tokio::spawn(manager.run_auto_refresh(shutdown.clone()));
    /// # }
    /// ```
    pub async fn run_auto_refresh(self: Arc<Self>, shutdown: CancellationToken) {
        let mut armed_rx = self.deadline.subscribe();
        info!("Token auto-refresh scheduler started");

        loop {
            let armed = *armed_rx.borrow_and_update();
            let wait = armed.map(|at| (at - self.clock.now()).to_std().unwrap_or(Duration::ZERO));

            let sleep = async move {
                match wait {
                    Some(wait) => tokio::time::sleep(wait).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                () = shutdown.cancelled() => break,
                changed = armed_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                () = sleep => {
                    if *self.deadline.borrow() != armed {
                        debug!("Stale renewal wake-up ignored");
                        continue;
                    }
                    debug!("Renewal deadline reached");
                    if let Err(e) = self.refresh().await {
                        warn!(error = %e, "Scheduled refresh did not complete");
                    }
                    self.deadline.send_if_modified(|deadline| {
                        if *deadline == armed {
                            *deadline = None;
                            true
                        } else {
                            false
                        }
                    });
                }
            }
        }

        info!("Token auto-refresh scheduler stopped");
    }
}

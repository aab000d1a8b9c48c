//! Authorization request builder
//!
//! Starts a login attempt: generates the per-attempt secrets, persists them
//! so they survive the redirect, and sends the user to the provider's
//! authorize endpoint with the PKCE challenge.

use std::sync::Arc;

use spoticizr_domain::Config;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::pkce::{PendingAuthorization, PkceError};
use super::storage::{save_pending, StorageError};
use super::traits::{ClientStorage, Navigator, Route};
use super::types::AuthorizationRequest;

#[derive(Debug, Error)]
pub enum AuthorizeError {
    /// Required configuration is missing or malformed
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Pkce(#[from] PkceError),

    #[error("failed to persist pending authorization: {0}")]
    Storage(#[from] StorageError),
}

/// Builds and launches provider authorization requests
pub struct AuthorizationBuilder<S: ClientStorage + 'static> {
    config: Config,
    storage: Arc<S>,
    navigator: Arc<dyn Navigator>,
}

impl<S: ClientStorage + 'static> AuthorizationBuilder<S> {
    #[must_use]
    pub fn new(config: Config, storage: Arc<S>, navigator: Arc<dyn Navigator>) -> Self {
        Self { config, storage, navigator }
    }

    /// Begin a login attempt
    ///
    /// Any earlier pending authorization is overwritten, so only the most
    /// recent attempt can complete. On success the navigator has been sent
    /// to the provider and the built request is returned.
    ///
    /// # Errors
    /// - [`AuthorizeError::Config`] before anything is written when the
    ///   client id, redirect URI, scopes or authorize endpoint are unusable.
    /// - [`AuthorizeError::Pkce`] when the secure random source fails.
    /// - [`AuthorizeError::Storage`] when the pending authorization cannot be
    ///   persisted; no navigation happens in that case.
    pub fn begin(&self) -> Result<AuthorizationRequest, AuthorizeError> {
        let endpoint = self.validated_endpoint()?;

        let pending = PendingAuthorization::generate()?;
        let code_challenge = pending.code_challenge();

        let mut url = endpoint;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", &self.config.client.scopes.join(" "))
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("state", &pending.state)
            .append_pair("code_challenge_method", pending.challenge_method())
            .append_pair("code_challenge", &code_challenge);

        save_pending(&*self.storage, &pending)?;
        debug!(
            state_len = pending.state.len(),
            verifier_len = pending.code_verifier.len(),
            "pending authorization stored"
        );

        info!(endpoint = %self.config.client.authorize_url, "redirecting to provider for authorization");
        self.navigator.navigate(Route::External(url.clone()));

        Ok(AuthorizationRequest { url, state: pending.state, code_challenge })
    }

    fn validated_endpoint(&self) -> Result<Url, AuthorizeError> {
        self.config.validate().map_err(|e| AuthorizeError::Config(e.to_string()))?;

        Url::parse(&self.config.redirect_uri).map_err(|e| {
            AuthorizeError::Config(format!("redirect URI {}: {e}", self.config.redirect_uri))
        })?;

        Url::parse(&self.config.client.authorize_url).map_err(|e| {
            AuthorizeError::Config(format!(
                "authorize endpoint {}: {e}",
                self.config.client.authorize_url
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::authorize.
    use spoticizr_domain::constants::{CODE_VERIFIER_KEY, PKCE_STATE_KEY};

    use super::*;
    use crate::auth::pkce::derive_challenge;
    use crate::testing::{MockStorage, RecordingNavigator};

    fn config() -> Config {
        Config::new("client-123", "http://127.0.0.1:8888/callback")
    }

    fn builder(
        config: Config,
    ) -> (AuthorizationBuilder<MockStorage>, Arc<MockStorage>, Arc<RecordingNavigator>) {
        let storage = Arc::new(MockStorage::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let builder = AuthorizationBuilder::new(config, storage.clone(), navigator.clone());
        (builder, storage, navigator)
    }

    /// Validates `AuthorizationBuilder::begin` behavior for the authorize URL
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms query parameters appear in the documented order.
    /// - Confirms scopes are space-joined and the challenge matches the
    ///   stored verifier.
    /// - Confirms the navigator was sent to the built URL.
    #[test]
    fn test_begin_builds_authorize_url() {
        let (builder, storage, navigator) = builder(config());

        let request = builder.begin().expect("authorization request");

        let keys: Vec<String> = request.url.query_pairs().map(|(k, _)| k.into_owned()).collect();
        assert_eq!(
            keys,
            vec![
                "response_type",
                "client_id",
                "scope",
                "redirect_uri",
                "state",
                "code_challenge_method",
                "code_challenge"
            ]
        );
        assert!(request.url.as_str().starts_with("https://accounts.spotify.com/authorize?"));

        let params: std::collections::HashMap<_, _> = request.url.query_pairs().into_owned().collect();
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["code_challenge_method"], "S256");
        assert!(params["scope"].starts_with("user-read-private user-read-email"));
        assert_eq!(params["state"], request.state);

        let verifier = storage.value(CODE_VERIFIER_KEY).expect("verifier stored");
        assert_eq!(params["code_challenge"], derive_challenge(&verifier));
        assert_eq!(storage.value(PKCE_STATE_KEY).as_deref(), Some(request.state.as_str()));

        assert_eq!(navigator.routes(), vec![Route::External(request.url.clone())]);
    }

    /// Validates `AuthorizationBuilder::begin` behavior for the repeated login
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures a second attempt overwrites the first pending state.
    #[test]
    fn test_second_attempt_overwrites_pending() {
        let (builder, storage, _navigator) = builder(config());

        let first = builder.begin().unwrap();
        let second = builder.begin().unwrap();

        assert_ne!(first.state, second.state);
        assert_eq!(storage.value(PKCE_STATE_KEY), Some(second.state));
    }

    /// Validates `AuthorizationBuilder::begin` behavior for the missing client
    /// id scenario.
    ///
    /// Assertions:
    /// - Ensures the result is `AuthorizeError::Config`.
    /// - Ensures nothing was stored and no navigation happened.
    #[test]
    fn test_missing_client_id_fails_before_side_effects() {
        let (builder, storage, navigator) = builder(Config::new("", "http://127.0.0.1:8888/callback"));

        let result = builder.begin();

        assert!(matches!(result, Err(AuthorizeError::Config(_))));
        assert!(storage.is_empty());
        assert!(navigator.routes().is_empty());
    }

    /// Validates `AuthorizationBuilder::begin` behavior for the malformed
    /// endpoint scenario.
    ///
    /// Assertions:
    /// - Ensures an unparsable authorize endpoint is a config error.
    #[test]
    fn test_malformed_authorize_endpoint() {
        let mut config = config();
        config.client.authorize_url = "::not a url::".to_string();
        let (builder, storage, _navigator) = builder(config);

        assert!(matches!(builder.begin(), Err(AuthorizeError::Config(_))));
        assert!(storage.is_empty());
    }

    /// Validates `AuthorizationBuilder::begin` behavior for the storage
    /// failure scenario.
    ///
    /// Assertions:
    /// - Ensures a failed write surfaces as `Storage` and skips navigation.
    #[test]
    fn test_storage_failure_skips_navigation() {
        let (builder, storage, navigator) = builder(config());
        storage.fail_writes(true);

        assert!(matches!(builder.begin(), Err(AuthorizeError::Storage(_))));
        assert!(navigator.routes().is_empty());
    }
}

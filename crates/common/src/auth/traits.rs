//! Seams between the session core and its environment
//!
//! The relay, the persistent key/value store and the navigation surface are
//! all injected so the state machines can be driven by in-memory fakes.

use async_trait::async_trait;
use url::Url;

use super::client::RelayClientError;
use super::storage::StorageError;
use super::types::TokenResponse;

/// Trait for the backend token relay
///
/// The relay holds the client secret and talks to the provider's token
/// endpoint on the client's behalf.
#[async_trait]
pub trait RelayClientTrait: Send + Sync {
    /// Exchange an authorization code plus PKCE verifier for tokens
    ///
    /// # Errors
    /// Returns error if the relay is unreachable or reports a failed
    /// exchange.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, RelayClientError>;

    /// Mint a new access token from a refresh token
    ///
    /// The response carries a `refresh_token` only if the provider rotated
    /// it.
    ///
    /// # Errors
    /// Returns error if the relay is unreachable or the refresh is rejected.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, RelayClientError>;
}

/// Persistent string key/value store scoped to the application origin
///
/// Multi-key writes are applied as a unit: after `set_many` or
/// `remove_many` returns, either every key reflects the call or none does.
pub trait ClientStorage: Send + Sync {
    /// Read a single key
    ///
    /// # Errors
    /// Returns error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write several keys in one operation
    ///
    /// # Errors
    /// Returns error if the backing store cannot be written.
    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StorageError>;

    /// Remove several keys in one operation; absent keys are ignored
    ///
    /// # Errors
    /// Returns error if the backing store cannot be written.
    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError>;

    /// Write a single key
    ///
    /// # Errors
    /// Returns error if the backing store cannot be written.
    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.set_many(&[(key, value)])
    }
}

/// Navigation target requested by the session core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Unauthenticated entry surface
    Login,
    /// Authenticated landing surface
    Dashboard,
    /// Leave the application (e.g. the provider's authorize page)
    External(Url),
}

impl Route {
    /// Path or URL this route resolves to
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Login => spoticizr_domain::constants::LOGIN_ROUTE,
            Self::Dashboard => spoticizr_domain::constants::DASHBOARD_ROUTE,
            Self::External(url) => url.as_str(),
        }
    }
}

/// Sink for navigation requests (browser location, CLI output, ...)
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_AUTHORIZE_URL, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_REFRESH_MARGIN_SECS, DEFAULT_RELAY_BIND, DEFAULT_RELAY_URL, DEFAULT_SCOPES,
    DEFAULT_STATE_FILE, DEFAULT_TOKEN_URL,
};
use crate::errors::{Result, SpoticizrError};

/// Application configuration
///
/// `client_id` and `redirect_uri` are injected at deploy time and shared by
/// the login client and the relay; everything else has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Login client (browser-side) configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub relay_url: String,
    pub api_base_url: String,
    pub refresh_margin_secs: u64,
    pub http_timeout_secs: u64,
    pub state_path: String,
}

/// Token relay (trusted backend) configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind: String,
    pub token_url: String,
    pub http_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            relay_url: DEFAULT_RELAY_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            refresh_margin_secs: DEFAULT_REFRESH_MARGIN_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            state_path: DEFAULT_STATE_FILE.to_string(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_RELAY_BIND.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create a configuration with default client and relay sections.
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            client: ClientConfig::default(),
            relay: RelayConfig::default(),
        }
    }

    /// Fail fast on values the authorization request cannot be built without.
    ///
    /// # Errors
    /// Returns `SpoticizrError::Config` naming the first missing value.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(SpoticizrError::Config("client id is missing".to_string()));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(SpoticizrError::Config("redirect URI is missing".to_string()));
        }
        if self.client.scopes.is_empty() {
            return Err(SpoticizrError::Config("scope list is empty".to_string()));
        }
        Ok(())
    }
}

impl ClientConfig {
    /// Renewal fires this long before the access token expires.
    #[must_use]
    pub const fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }

    /// Upper bound for a single relay request.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl RelayConfig {
    /// Upper bound for a single token endpoint request.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

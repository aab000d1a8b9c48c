//! Provider token endpoint client
//!
//! Performs the form-encoded `authorization_code` and `refresh_token` grants
//! on behalf of the login client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use spoticizr_common::auth::{OAuthError, TokenResponse};
use spoticizr_domain::{Config, SpoticizrError};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Error type for token endpoint calls
#[derive(Debug, Error)]
pub enum TokenEndpointError {
    /// Provider answered with a non-success status; `body` is its JSON (or
    /// the raw text wrapped in a JSON string)
    #[error("token endpoint rejected request ({status})")]
    Rejected { status: u16, body: Value },

    /// The provider could not be reached
    #[error("token endpoint unreachable: {0}")]
    Network(#[from] reqwest::Error),

    /// Success status with an unusable body
    #[error("unexpected token endpoint response: {0}")]
    InvalidResponse(String),
}

impl TokenEndpointError {
    /// Human-readable provider message, preferring `error_description`
    #[must_use]
    pub fn description(&self) -> Option<String> {
        let Self::Rejected { body, .. } = self else {
            return None;
        };
        match OAuthError::deserialize(body) {
            Ok(oauth) => Some(oauth.error_description.unwrap_or(oauth.error)),
            Err(_) => body.as_str().map(str::to_string),
        }
    }
}

/// HTTP client for the provider token endpoint
#[derive(Debug, Clone)]
pub struct TokenEndpointClient {
    client: Client,
    token_url: Url,
    client_id: String,
    redirect_uri: String,
}

impl TokenEndpointClient {
    /// Build a client from the shared configuration
    ///
    /// # Errors
    /// Returns `SpoticizrError::Config` for an invalid token URL or HTTP
    /// client settings.
    pub fn new(config: &Config) -> Result<Self, SpoticizrError> {
        Self::with_token_url(
            &config.relay.token_url,
            &config.client_id,
            &config.redirect_uri,
            config.relay.http_timeout(),
        )
    }

    /// Build a client for an explicit token endpoint
    ///
    /// # Errors
    /// Returns `SpoticizrError::Config` for an invalid token URL or HTTP
    /// client settings.
    pub fn with_token_url(
        token_url: &str,
        client_id: &str,
        redirect_uri: &str,
        timeout: Duration,
    ) -> Result<Self, SpoticizrError> {
        let token_url = Url::parse(token_url)
            .map_err(|e| SpoticizrError::Config(format!("token URL {token_url}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| SpoticizrError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token_url,
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
        })
    }

    /// `authorization_code` grant with the PKCE verifier
    ///
    /// # Errors
    /// See [`TokenEndpointError`].
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, TokenEndpointError> {
        debug!(code_len = code.len(), "Exchanging authorization code");
        self.post(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.redirect_uri),
            ("client_id", &self.client_id),
            ("code_verifier", code_verifier),
        ])
        .await
    }

    /// `refresh_token` grant
    ///
    /// # Errors
    /// See [`TokenEndpointError`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, TokenEndpointError> {
        debug!("Refreshing access token");
        self.post(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
        ])
        .await
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<TokenResponse, TokenEndpointError> {
        let response = self.client.post(self.token_url.clone()).form(form).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            warn!(status = status.as_u16(), "Token endpoint rejected request");
            return Err(TokenEndpointError::Rejected { status: status.as_u16(), body });
        }

        serde_json::from_str(&text).map_err(|e| TokenEndpointError::InvalidResponse(e.to_string()))
    }
}

//! HTTP client for the backend token relay
//!
//! The browser-side half of the flow never sees the client secret. It hands
//! the authorization code and verifier (or a refresh token) to the relay,
//! which performs the provider call and returns the token payload.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use spoticizr_domain::constants::{RELAY_EXCHANGE_PATH, RELAY_REFRESH_PATH};
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::traits::RelayClientTrait;
use super::types::TokenResponse;

/// Error type for relay client operations
#[derive(Debug, Error)]
pub enum RelayClientError {
    /// HTTP request failed (connect, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Relay answered with a non-success status
    #[error("Relay rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Failed to parse response
    #[error("Parse error: {0}")]
    ParseError(String),

    /// No refresh token available
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeBody<'a> {
    code: &'a str,
    code_verifier: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

/// Relay client over `reqwest`
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: Client,
    exchange_url: Url,
    refresh_url: Url,
}

impl RelayClient {
    /// Create a client for the relay rooted at `relay_url`
    ///
    /// # Errors
    /// Returns [`RelayClientError::ConfigError`] if the base URL is invalid
    /// or the HTTP client cannot be built.
    pub fn new(relay_url: &str, timeout: Duration) -> Result<Self, RelayClientError> {
        let base = Url::parse(relay_url)
            .map_err(|e| RelayClientError::ConfigError(format!("relay URL {relay_url}: {e}")))?;
        let exchange_url = base
            .join(RELAY_EXCHANGE_PATH)
            .map_err(|e| RelayClientError::ConfigError(e.to_string()))?;
        let refresh_url = base
            .join(RELAY_REFRESH_PATH)
            .map_err(|e| RelayClientError::ConfigError(e.to_string()))?;

        let builder = Client::builder().timeout(timeout);
        let builder = if std::env::var_os("SPOTICIZR_DISABLE_PROXY").is_some() {
            builder.no_proxy()
        } else {
            builder
        };
        let client = builder.build().map_err(|e| RelayClientError::ConfigError(e.to_string()))?;

        Ok(Self { client, exchange_url, refresh_url })
    }

    /// Exchange an authorization code and verifier for tokens
    ///
    /// # Errors
    /// Returns error if the request fails or the relay reports an error.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, RelayClientError> {
        debug!(url = %self.exchange_url, "exchanging authorization code via relay");
        let response = self
            .client
            .post(self.exchange_url.clone())
            .json(&ExchangeBody { code, code_verifier })
            .send()
            .await?;

        Self::parse_token_response(response).await
    }

    /// Refresh an access token
    ///
    /// # Errors
    /// Returns error if no refresh token is given, the request fails, or the
    /// relay reports an error.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, RelayClientError> {
        if refresh_token.is_empty() {
            return Err(RelayClientError::NoRefreshToken);
        }

        debug!(url = %self.refresh_url, "refreshing access token via relay");
        let response = self
            .client
            .post(self.refresh_url.clone())
            .json(&RefreshBody { refresh_token })
            .send()
            .await?;

        Self::parse_token_response(response).await
    }

    async fn parse_token_response(
        response: reqwest::Response,
    ) -> Result<TokenResponse, RelayClientError> {
        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = match body.get("error") {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(RelayClientError::Rejected { status: status.as_u16(), message });
        }

        response.json().await.map_err(|e| RelayClientError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl RelayClientTrait for RelayClient {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, RelayClientError> {
        self.exchange_code(code, code_verifier).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, RelayClientError> {
        self.refresh(refresh_token).await
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::client.
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> RelayClient {
        std::env::set_var("SPOTICIZR_DISABLE_PROXY", "1");
        RelayClient::new(&server.uri(), Duration::from_secs(5)).expect("relay client")
    }

    /// Validates `RelayClient::exchange_code` behavior for the successful
    /// exchange scenario.
    ///
    /// Assertions:
    /// - Confirms the request body carries `code` and `codeVerifier`.
    /// - Confirms the parsed response exposes both tokens.
    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/callback"))
            .and(body_json(serde_json::json!({"code": "C1", "codeVerifier": "V1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "AT1",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "RT1",
                "scope": "user-top-read"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).exchange_code("C1", "V1").await.expect("exchange");

        assert_eq!(response.access_token, "AT1");
        assert_eq!(response.refresh_token.as_deref(), Some("RT1"));
        assert_eq!(response.expires_in, 3600);
    }

    /// Validates `RelayClient::exchange_code` behavior for the relay error
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures a 400 with `{error}` becomes `Rejected` with that message.
    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/callback"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "Invalid authorization code"})),
            )
            .mount(&server)
            .await;

        let result = client_for(&server).exchange_code("bad", "V1").await;

        match result {
            Err(RelayClientError::Rejected { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid authorization code");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    /// Validates `RelayClient::refresh` behavior for the refresh body
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the request body is `{refreshToken}`.
    /// - Ensures a response without `refresh_token` parses with `None`.
    #[tokio::test]
    async fn test_refresh_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/spotify/refresh-token"))
            .and(body_json(serde_json::json!({"refreshToken": "RT1"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "AT2", "expires_in": 3600})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).refresh("RT1").await.expect("refresh");

        assert_eq!(response.access_token, "AT2");
        assert!(response.refresh_token.is_none());
    }

    /// Validates `RelayClient::refresh` behavior for the object-shaped error
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures a structured `error` value is preserved as its JSON text.
    #[tokio::test]
    async fn test_refresh_rejected_with_object_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/spotify/refresh-token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"error": "invalid_grant", "error_description": "Refresh token revoked"}
            })))
            .mount(&server)
            .await;

        let result = client_for(&server).refresh("RT1").await;

        match result {
            Err(RelayClientError::Rejected { status, message }) => {
                assert_eq!(status, 400);
                assert!(message.contains("invalid_grant"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    /// Validates `RelayClient::refresh` behavior for the empty token scenario.
    ///
    /// Assertions:
    /// - Ensures `matches!(result, Err(RelayClientError::NoRefreshToken))`.
    #[tokio::test]
    async fn test_refresh_with_empty_token() {
        let client = RelayClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let result = client.refresh("").await;
        assert!(matches!(result, Err(RelayClientError::NoRefreshToken)));
    }

    /// Validates `RelayClient::new` behavior for the invalid base URL
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures an unparsable relay URL yields `ConfigError`.
    #[test]
    fn test_invalid_relay_url() {
        let result = RelayClient::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(RelayClientError::ConfigError(_))));
    }
}

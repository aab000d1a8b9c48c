//! Authorized Spotify Web API client
//!
//! Every request carries the session's bearer token. A 401 is answered by
//! asking the token provider for a refreshed token and repeating the call
//! once; a second 401 revokes the session.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use spoticizr_domain::Config;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::auth::AccessTokenProvider;
use super::errors::ApiError;
use crate::http::HttpClient;

/// Current user's profile (`GET /v1/me`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
}

/// Web API client bound to one token provider
pub struct SpotifyApiClient {
    http_client: HttpClient,
    auth: Arc<dyn AccessTokenProvider>,
    base_url: Url,
}

impl SpotifyApiClient {
    /// Create a client for `config.client.api_base_url`
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: &Config, auth: Arc<dyn AccessTokenProvider>) -> Result<Self, ApiError> {
        Self::with_base_url(&config.client.api_base_url, config.client.http_timeout(), auth)
    }

    /// Create a client for an explicit base URL
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn with_base_url(
        base_url: &str,
        timeout: Duration,
        auth: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Config(format!("invalid API base URL {base_url}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("spoticizr/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http_client, auth, base_url })
    }

    /// Fetch the signed-in user's profile
    ///
    /// # Errors
    /// See [`SpotifyApiClient::get`].
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.get("v1/me").await
    }

    /// Execute an authorized GET request
    ///
    /// # Errors
    /// - `ApiError::Auth` without a session, when the refresh failed, or
    ///   when the refreshed token was rejected as well (the session is
    ///   revoked then).
    /// - Status and decoding errors otherwise.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;

        let token = self.auth.access_token().await?;
        let mut response = self.send(Method::GET, &url, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(%url, "Access token rejected; refreshing and retrying once");
            let renewed = self.auth.token_rejected(&token).await?;
            response = self.send(Method::GET, &url, &renewed).await?;

            if response.status() == StatusCode::UNAUTHORIZED {
                warn!(%url, "Refreshed token rejected as well; signing out");
                self.auth.revoke()?;
                return Err(ApiError::Auth(
                    "access token rejected after refresh; signed out".to_string(),
                ));
            }
        }

        let result = decode(response, &url).await?;
        info!(path = %path, "GET request successful");
        Ok(result)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Config(format!("invalid API path {path}: {e}")))
    }

    async fn send(&self, method: Method, url: &Url, token: &str) -> Result<Response, ApiError> {
        debug!(%method, %url, "API request");
        let request = self
            .http_client
            .request(method, url.clone())
            .bearer_auth(token)
            .header("Accept", "application/json");
        self.http_client.send(request).await
    }
}

impl std::fmt::Debug for SpotifyApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyApiClient").field("base_url", &self.base_url.as_str()).finish()
    }
}

async fn decode<T: DeserializeOwned>(response: Response, url: &Url) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(map_status_error(status, url, body));
    }

    response.json().await.map_err(|e| ApiError::Client(format!("Failed to parse response: {e}")))
}

fn map_status_error(status: StatusCode, url: &Url, body: String) -> ApiError {
    let message = if body.is_empty() {
        format!("{url} returned {status}")
    } else {
        format!("{url} returned {status}: {body}")
    };
    ApiError::from_status(status, message.clone()).unwrap_or(ApiError::Client(message))
}

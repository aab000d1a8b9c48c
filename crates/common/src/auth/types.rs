//! OAuth 2.0 types and structures
//!
//! Token material held by the session, the wire shapes exchanged with the
//! relay and the provider, and the redirect event that drives the callback
//! state machine.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// OAuth 2.0 access and refresh tokens with an absolute expiry
///
/// `expires_at` is issuance time plus the provider-declared `expires_in`. It
/// is persisted as milliseconds since the epoch, so it is kept at millisecond
/// precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Bearer credential attached to upstream API calls
    pub access_token: String,

    /// Long-lived credential used to mint new access tokens
    /// Optional because some issuance paths return access-token-only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type (always "Bearer" for this provider)
    pub token_type: String,

    /// Access token lifetime in seconds, as declared at issuance
    pub expires_in: i64,

    /// Absolute expiration timestamp (UTC)
    pub expires_at: DateTime<Utc>,

    /// Granted scopes (space-separated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Create a `TokenSet` issued at `issued_at`.
    #[must_use]
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        scope: Option<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let expires_at = truncate_to_millis(issued_at + chrono::Duration::seconds(expires_in));

        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
            expires_at,
            scope,
        }
    }

    /// Build a token set from a token endpoint response received at
    /// `issued_at`.
    #[must_use]
    pub fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        let mut tokens = Self::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            response.scope,
            issued_at,
        );
        tokens.token_type = response.token_type;
        tokens
    }

    /// Apply a refresh response on top of this token set.
    ///
    /// The refresh token is replaced only when the provider rotated it;
    /// otherwise the existing one is carried forward.
    #[must_use]
    pub fn renewed(&self, response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        let refresh_token = response.refresh_token.clone().or_else(|| self.refresh_token.clone());
        let scope = response.scope.clone().or_else(|| self.scope.clone());
        let mut renewed = Self::from_response(response, issued_at);
        renewed.refresh_token = refresh_token;
        renewed.scope = scope;
        renewed
    }

    /// Whether the access token is no longer usable at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether `now` falls inside the renewal window before expiry.
    #[must_use]
    pub fn needs_refresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now >= self.renew_at(margin)
    }

    /// Instant at which renewal should happen.
    ///
    /// Normally `margin` before expiry. A lifetime shorter than twice the
    /// margin renews at its halfway point instead, so a short-lived token is
    /// never due the moment it is issued. A token restored from storage has
    /// no known lifetime and always uses the full margin.
    #[must_use]
    pub fn renew_at(&self, margin: Duration) -> DateTime<Utc> {
        let margin = chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero());
        let lead = if self.expires_in > 0 {
            margin.min(chrono::Duration::milliseconds(self.expires_in * 500))
        } else {
            margin
        };
        self.expires_at - lead
    }

    /// Expiry as milliseconds since the epoch (the persisted form).
    #[must_use]
    pub fn expires_at_millis(&self) -> i64 {
        self.expires_at.timestamp_millis()
    }

    /// Get seconds until token expiration, relative to `now`
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds()
    }
}

/// Convert persisted epoch milliseconds back into a timestamp.
#[must_use]
pub fn datetime_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    datetime_from_millis(at.timestamp_millis()).unwrap_or(at)
}

/// OAuth token response
///
/// Standard OAuth 2.0 token response (RFC 6749 §5.1). The relay forwards the
/// provider's body unchanged for code exchange and a reduced
/// `{access_token, expires_in, refresh_token?}` body for refresh; both
/// deserialize into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// OAuth error response from the authorization server
///
/// Standard OAuth 2.0 error response format (RFC 6749 §5.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}

/// Inbound provider redirect (`AuthorizationRedirectReceived`)
///
/// Carries whatever the provider put on the redirect target's query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthorizationRedirect {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl AuthorizationRedirect {
    /// Redirect carrying an authorization code and state.
    #[must_use]
    pub fn new(code: impl Into<String>, state: impl Into<String>) -> Self {
        Self { code: Some(code.into()), state: Some(state.into()), error: None }
    }

    /// Extract the callback parameters from a full redirect URL.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let mut redirect = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => redirect.code = Some(value.into_owned()),
                "state" => redirect.state = Some(value.into_owned()),
                "error" => redirect.error = Some(value.into_owned()),
                _ => {}
            }
        }
        redirect
    }

    /// Neither `code` nor `state` (nor a provider error) is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.state.is_none() && self.error.is_none()
    }
}

/// The authorization request sent to the provider (derived, not stored)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Full provider authorize URL including every query parameter
    pub url: Url,
    /// Anti-CSRF token round-tripped through the redirect
    pub state: String,
    /// `BASE64URL(SHA256(code_verifier))`
    pub code_challenge: String,
}

//! Web API transport
//!
//! Sends one logical request with bounded retries. Every attempt is
//! classified as an [`ApiError`] and repeated only when
//! [`ApiError::should_retry`] allows it:
//! - 429 waits for the provider's `Retry-After` (seconds), up to a cap
//! - 5xx and connection failures back off exponentially
//!
//! 401 is never repeated here; the bearer-token layer above owns it.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::api::errors::ApiError;

/// How often and how patiently a request is repeated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    pub base_backoff: Duration,
    /// Longest `Retry-After` honoured; a longer one goes back to the caller
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            max_retry_after: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Exponential delay before retry number `retry` (1-based)
    fn backoff(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(8);
        self.base_backoff.saturating_mul(1u32 << shift)
    }
}

/// Outbound client for the Spotify Web API
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    policy: RetryPolicy,
}

impl HttpClient {
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Start a request on the underlying connection pool.
    pub fn request<U: reqwest::IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        self.client.request(method, url)
    }

    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send `request`, repeating retryable failures.
    ///
    /// Any response that is not retried (success, 4xx, a 429 whose wait is
    /// too long, or the last attempt's 429/5xx) is returned for the caller to
    /// decode.
    ///
    /// # Errors
    /// - `ApiError::Network` when no attempt produced a response.
    /// - `ApiError::Config` / `ApiError::Client` for requests that cannot be
    ///   built or replayed.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let replay = request
                .try_clone()
                .ok_or_else(|| ApiError::Client("streaming request body cannot be replayed".into()))?;
            let is_last = attempt >= attempts;

            let delay = match replay.send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt, url = %response.url(), %status, "Web API response");
                    if is_last || !is_retryable(status) {
                        return Ok(response);
                    }
                    match self.delay_after(&response, attempt) {
                        Some(delay) => {
                            warn!(attempt, %status, ?delay, "Retryable Web API status; retrying");
                            delay
                        }
                        None => return Ok(response),
                    }
                }
                Err(err) => {
                    let classified = transport_error(&err);
                    if is_last || !classified.should_retry() {
                        return Err(classified);
                    }
                    warn!(attempt, error = %err, "Web API request failed; retrying");
                    self.policy.backoff(attempt)
                }
            };

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Wait before repeating a retryable response; `None` when the provider
    /// asks for longer than the policy allows
    fn delay_after(&self, response: &Response, attempt: u32) -> Option<Duration> {
        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return Some(self.policy.backoff(attempt));
        }
        match retry_after(response) {
            Some(wait) if wait > self.policy.max_retry_after => {
                warn!(?wait, "Rate limited for longer than the retry cap; giving up");
                None
            }
            Some(wait) => Some(wait),
            None => Some(self.policy.backoff(attempt)),
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    ApiError::from_status(status, String::new()).is_some_and(|err| err.should_retry())
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn transport_error(err: &reqwest::Error) -> ApiError {
    if err.is_builder() {
        ApiError::Config(format!("invalid request: {err}"))
    } else if err.is_timeout() {
        ApiError::Network(format!("request timed out: {err}"))
    } else if err.is_connect() || err.is_request() {
        ApiError::Network(format!("request failed: {err}"))
    } else {
        ApiError::Client(err.to_string())
    }
}

/// Builder for [`HttpClient`]
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    policy: RetryPolicy,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), policy: RetryPolicy::default(), user_agent: None }
    }
}

impl HttpClientBuilder {
    /// Per-attempt timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// # Errors
    /// Returns `ApiError::Config` if the TLS backend cannot be initialised.
    pub fn build(self) -> Result<HttpClient, ApiError> {
        let mut builder = Client::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client =
            builder.build().map_err(|e| ApiError::Config(format!("HTTP client setup failed: {e}")))?;

        Ok(HttpClient { client, policy: self.policy })
    }
}

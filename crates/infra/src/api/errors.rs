//! API-specific error types
//!
//! Classifies upstream Web API failures so callers can decide whether a
//! retry makes sense.

use reqwest::StatusCode;
use spoticizr_domain::SpoticizrError;
use thiserror::Error;

/// Categories of API errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// 401 that survived a token refresh, or no session at all
    Authentication,
    /// 429
    RateLimit,
    /// 5xx
    Server,
    /// Other 4xx and undecodable bodies
    Client,
    /// Connection failures and timeouts
    Network,
    /// Bad base URL or client settings
    Config,
}

/// Web API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Classify a Web API status; `None` for success
    #[must_use]
    pub fn from_status(status: StatusCode, message: String) -> Option<Self> {
        if status.is_success() {
            return None;
        }
        Some(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Auth(message),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimit(message),
            s if s.is_server_error() => Self::Server(message),
            _ => Self::Client(message),
        })
    }

    /// Get the error category for this error
    #[must_use]
    pub const fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server(_) => ApiErrorCategory::Server,
            Self::Client(_) => ApiErrorCategory::Client,
            Self::Network(_) => ApiErrorCategory::Network,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// Whether repeating the same call later may succeed
    ///
    /// Authentication failures are final: the session has already been
    /// refreshed once and logged out.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        matches!(
            self.category(),
            ApiErrorCategory::RateLimit | ApiErrorCategory::Server | ApiErrorCategory::Network
        )
    }
}

impl From<SpoticizrError> for ApiError {
    fn from(err: SpoticizrError) -> Self {
        match err {
            SpoticizrError::Network(msg) => Self::Network(msg),
            SpoticizrError::Auth(msg) | SpoticizrError::Security(msg) => Self::Auth(msg),
            SpoticizrError::Config(msg) => Self::Config(msg),
            other => Self::Client(other.to_string()),
        }
    }
}

impl From<ApiError> for SpoticizrError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(msg) => Self::Auth(msg),
            ApiError::Network(msg) => Self::Network(msg),
            ApiError::Config(msg) => Self::Config(msg),
            ApiError::RateLimit(_) | ApiError::Server(_) | ApiError::Client(_) => {
                Self::Network(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(ApiError::Auth("test".into()).category(), ApiErrorCategory::Authentication);
        assert_eq!(ApiError::RateLimit("test".into()).category(), ApiErrorCategory::RateLimit);
        assert_eq!(ApiError::Server("test".into()).category(), ApiErrorCategory::Server);
        assert_eq!(ApiError::Network("test".into()).category(), ApiErrorCategory::Network);
    }

    #[test]
    fn test_from_status() {
        let classify = |code: u16| {
            ApiError::from_status(StatusCode::from_u16(code).unwrap(), String::new())
                .map(|err| err.category())
        };

        assert_eq!(classify(200), None);
        assert_eq!(classify(401), Some(ApiErrorCategory::Authentication));
        assert_eq!(classify(403), Some(ApiErrorCategory::Authentication));
        assert_eq!(classify(429), Some(ApiErrorCategory::RateLimit));
        assert_eq!(classify(503), Some(ApiErrorCategory::Server));
        assert_eq!(classify(404), Some(ApiErrorCategory::Client));
    }

    #[test]
    fn test_should_retry() {
        assert!(!ApiError::Auth("test".into()).should_retry());
        assert!(ApiError::RateLimit("test".into()).should_retry());
        assert!(ApiError::Server("test".into()).should_retry());
        assert!(ApiError::Network("test".into()).should_retry());
        assert!(!ApiError::Client("test".into()).should_retry());
        assert!(!ApiError::Config("test".into()).should_retry());
    }

    #[test]
    fn test_domain_round_trip_keeps_auth() {
        let err: SpoticizrError = ApiError::Auth("expired".into()).into();
        assert!(matches!(err, SpoticizrError::Auth(_)));

        let back: ApiError = err.into();
        assert_eq!(back.category(), ApiErrorCategory::Authentication);
    }
}

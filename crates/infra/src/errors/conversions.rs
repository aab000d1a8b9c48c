//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use spoticizr_common::auth::{
    AuthSessionError, AuthorizeError, CallbackRejection, PkceError, RelayClientError,
    StorageError, TokenManagerError,
};
use spoticizr_domain::SpoticizrError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SpoticizrError);

impl From<InfraError> for SpoticizrError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SpoticizrError> for InfraError {
    fn from(value: SpoticizrError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoSpoticizrError {
    fn into_spoticizr(self) -> SpoticizrError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SpoticizrError */
/* -------------------------------------------------------------------------- */

impl IntoSpoticizrError for HttpError {
    fn into_spoticizr(self) -> SpoticizrError {
        if self.is_timeout() {
            return SpoticizrError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SpoticizrError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => SpoticizrError::Auth(message),
                404 => SpoticizrError::NotFound(message),
                400..=499 => SpoticizrError::InvalidInput(message),
                _ => SpoticizrError::Network(message),
            };
        }

        SpoticizrError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_spoticizr())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error / serde_json::Error → SpoticizrError */
/* -------------------------------------------------------------------------- */

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        let message = value.to_string();
        InfraError(match value.kind() {
            std::io::ErrorKind::NotFound => SpoticizrError::NotFound(message),
            std::io::ErrorKind::AddrInUse | std::io::ErrorKind::AddrNotAvailable => {
                SpoticizrError::Network(message)
            }
            std::io::ErrorKind::PermissionDenied => SpoticizrError::Security(message),
            _ => SpoticizrError::Storage(message),
        })
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(SpoticizrError::InvalidInput(format!("invalid JSON: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* auth core errors → SpoticizrError */
/* -------------------------------------------------------------------------- */

impl IntoSpoticizrError for RelayClientError {
    fn into_spoticizr(self) -> SpoticizrError {
        match self {
            RelayClientError::RequestFailed(e) => e.into_spoticizr(),
            RelayClientError::Rejected { status, message } => {
                SpoticizrError::Auth(format!("relay rejected request ({status}): {message}"))
            }
            RelayClientError::ParseError(msg) => SpoticizrError::InvalidInput(msg),
            RelayClientError::NoRefreshToken => {
                SpoticizrError::Auth("no refresh token issued".into())
            }
            RelayClientError::ConfigError(msg) => SpoticizrError::Config(msg),
        }
    }
}

impl IntoSpoticizrError for StorageError {
    fn into_spoticizr(self) -> SpoticizrError {
        match self {
            StorageError::Io(msg) | StorageError::Serialization(msg) => {
                SpoticizrError::Storage(msg)
            }
        }
    }
}

impl IntoSpoticizrError for TokenManagerError {
    fn into_spoticizr(self) -> SpoticizrError {
        match self {
            TokenManagerError::NotAuthenticated => {
                SpoticizrError::Auth("not logged in; run `spoticizr login`".to_string())
            }
            TokenManagerError::NoRefreshToken => {
                SpoticizrError::Auth("session expired and cannot be renewed".to_string())
            }
            TokenManagerError::RefreshFailed(inner) => inner.into_spoticizr(),
            TokenManagerError::Storage(inner) => inner.into_spoticizr(),
        }
    }
}

impl IntoSpoticizrError for AuthorizeError {
    fn into_spoticizr(self) -> SpoticizrError {
        match self {
            AuthorizeError::Config(msg) => SpoticizrError::Config(msg),
            AuthorizeError::Pkce(PkceError::RandomUnavailable(msg)) => {
                SpoticizrError::Security(msg)
            }
            AuthorizeError::Pkce(other) => SpoticizrError::Internal(other.to_string()),
            AuthorizeError::Storage(inner) => inner.into_spoticizr(),
        }
    }
}

/// Map a session error onto the domain error.
#[must_use]
pub fn map_auth_session_error(err: AuthSessionError) -> SpoticizrError {
    match err {
        AuthSessionError::Authorize(inner) => inner.into_spoticizr(),
        AuthSessionError::TokenManager(inner) => inner.into_spoticizr(),
    }
}

/// Map a failed callback onto the domain error.
#[must_use]
pub fn map_callback_rejection(rejection: CallbackRejection) -> SpoticizrError {
    match rejection {
        CallbackRejection::StateMismatch => {
            SpoticizrError::Security("authorization state mismatch".to_string())
        }
        CallbackRejection::NoPendingAuthorization => SpoticizrError::Auth(
            "no login in progress (the redirect was already used or never started)".to_string(),
        ),
        CallbackRejection::MalformedCallback => {
            SpoticizrError::InvalidInput("redirect is missing code or state".to_string())
        }
        CallbackRejection::ProviderError(msg) => {
            SpoticizrError::Auth(format!("authorization denied: {msg}"))
        }
        CallbackRejection::ExchangeFailed(msg) => {
            SpoticizrError::Auth(format!("code exchange failed: {msg}"))
        }
        CallbackRejection::StorageFailed(msg) => SpoticizrError::Storage(msg),
    }
}

impl From<AuthSessionError> for InfraError {
    fn from(value: AuthSessionError) -> Self {
        InfraError(map_auth_session_error(value))
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_spoticizr())
    }
}

impl From<RelayClientError> for InfraError {
    fn from(value: RelayClientError) -> Self {
        InfraError(value.into_spoticizr())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

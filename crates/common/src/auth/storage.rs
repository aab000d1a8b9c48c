//! Persisted auth state
//!
//! Tokens and the pending authorization live under fixed string keys in a
//! [`ClientStorage`] so they survive the provider redirect and process
//! restarts. Expiry is stored as epoch milliseconds.

use spoticizr_domain::constants::{
    ACCESS_TOKEN_KEY, CODE_VERIFIER_KEY, EXPIRES_AT_KEY, PKCE_STATE_KEY, REFRESH_TOKEN_KEY,
};
use thiserror::Error;
use tracing::warn;

use super::pkce::PendingAuthorization;
use super::traits::ClientStorage;
use super::types::{datetime_from_millis, TokenSet};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(String),

    #[error("storage serialization failed: {0}")]
    Serialization(String),
}

/// Write a token set under the token keys.
///
/// The stored keys mirror the set exactly: without a refresh token any
/// stored one is removed first, so a later load never pairs the new access
/// token with an earlier session's refresh token.
///
/// # Errors
/// Propagates the storage error.
pub fn persist_tokens(storage: &dyn ClientStorage, tokens: &TokenSet) -> Result<(), StorageError> {
    let mut entries = vec![
        (ACCESS_TOKEN_KEY, tokens.access_token.clone()),
        (EXPIRES_AT_KEY, tokens.expires_at_millis().to_string()),
    ];
    match &tokens.refresh_token {
        Some(refresh) => entries.push((REFRESH_TOKEN_KEY, refresh.clone())),
        None => storage.remove_many(&[REFRESH_TOKEN_KEY])?,
    }
    storage.set_many(&entries)
}

/// Read the persisted token set, if any.
///
/// Returns `None` without an access token. A missing or unparsable expiry is
/// treated as already expired so the caller refreshes or logs out.
///
/// # Errors
/// Propagates the storage error.
pub fn load_tokens(storage: &dyn ClientStorage) -> Result<Option<TokenSet>, StorageError> {
    let Some(access_token) = storage.get(ACCESS_TOKEN_KEY)? else {
        return Ok(None);
    };
    let refresh_token = storage.get(REFRESH_TOKEN_KEY)?;

    let expires_at = storage
        .get(EXPIRES_AT_KEY)?
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .and_then(datetime_from_millis);

    let expires_at = match expires_at {
        Some(at) => at,
        None => {
            warn!("persisted token has no usable expiry; treating it as expired");
            chrono::DateTime::<chrono::Utc>::default()
        }
    };

    Ok(Some(TokenSet {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: 0,
        expires_at,
        scope: None,
    }))
}

/// Persist a pending authorization, overwriting any earlier attempt.
///
/// # Errors
/// Propagates the storage error.
pub fn save_pending(
    storage: &dyn ClientStorage,
    pending: &PendingAuthorization,
) -> Result<(), StorageError> {
    storage.set_many(&[
        (PKCE_STATE_KEY, pending.state.clone()),
        (CODE_VERIFIER_KEY, pending.code_verifier.clone()),
    ])
}

/// Read the pending authorization; both halves must be present.
///
/// # Errors
/// Propagates the storage error.
pub fn load_pending(
    storage: &dyn ClientStorage,
) -> Result<Option<PendingAuthorization>, StorageError> {
    let state = storage.get(PKCE_STATE_KEY)?;
    let code_verifier = storage.get(CODE_VERIFIER_KEY)?;
    Ok(match (state, code_verifier) {
        (Some(state), Some(code_verifier)) => Some(PendingAuthorization { state, code_verifier }),
        _ => None,
    })
}

/// Remove the pending authorization.
///
/// # Errors
/// Propagates the storage error.
pub fn clear_pending(storage: &dyn ClientStorage) -> Result<(), StorageError> {
    storage.remove_many(&[PKCE_STATE_KEY, CODE_VERIFIER_KEY])
}

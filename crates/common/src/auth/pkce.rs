//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 for authorization without a client secret. State and
//! verifier values are drawn from the operating system CSPRNG over the
//! alphanumeric alphabet; there is no fallback to a weaker source.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use spoticizr_domain::constants::{CODE_CHALLENGE_METHOD, CODE_VERIFIER_LENGTH, STATE_LENGTH};
use thiserror::Error;

/// Alphabet for generated state and verifier values (`[A-Za-z0-9]`)
const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Largest multiple of the alphabet size that fits in a byte. Bytes at or
/// above it are discarded so every symbol is equally likely.
const REJECTION_BOUND: u8 = 248;

/// RFC 7636 §4.1 verifier length bounds
const VERIFIER_MIN_LEN: usize = 43;
const VERIFIER_MAX_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum PkceError {
    #[error("secure random source unavailable: {0}")]
    RandomUnavailable(String),

    #[error("invalid code verifier: {0}")]
    InvalidVerifier(String),
}

/// Generate a uniformly random alphanumeric string of `length` characters
///
/// # Errors
/// Returns [`PkceError::RandomUnavailable`] if the OS random source fails.
/// Callers must abort the login attempt rather than retry with a weaker
/// source.
pub fn generate_random_string(length: usize) -> Result<String, PkceError> {
    let mut out = String::with_capacity(length);
    let mut buf = [0u8; 64];

    while out.len() < length {
        OsRng.try_fill_bytes(&mut buf).map_err(|e| PkceError::RandomUnavailable(e.to_string()))?;

        for byte in buf {
            if byte >= REJECTION_BOUND {
                continue;
            }
            out.push(char::from(ALPHABET[usize::from(byte % 62)]));
            if out.len() == length {
                break;
            }
        }
    }

    Ok(out)
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier)))
/// with no padding.
#[must_use]
pub fn derive_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Check a verifier against RFC 7636 §4.1 (length and unreserved charset)
///
/// # Errors
/// Returns [`PkceError::InvalidVerifier`] describing the violation.
pub fn validate_code_verifier(verifier: &str) -> Result<(), PkceError> {
    let len = verifier.len();
    if !(VERIFIER_MIN_LEN..=VERIFIER_MAX_LEN).contains(&len) {
        return Err(PkceError::InvalidVerifier(format!(
            "length {len} outside {VERIFIER_MIN_LEN}..={VERIFIER_MAX_LEN}"
        )));
    }
    if let Some(c) =
        verifier.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')))
    {
        return Err(PkceError::InvalidVerifier(format!("illegal character {c:?}")));
    }
    Ok(())
}

/// Validate that the state token matches
///
/// Compares in constant time with respect to the contents so the callback
/// does not leak how many leading characters were right.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    let (a, b) = (expected.as_bytes(), actual.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Per-attempt secrets generated before redirecting to the provider
///
/// `state` travels through the redirect and must come back unchanged;
/// `code_verifier` never leaves the client until the code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    pub state: String,
    pub code_verifier: String,
}

impl PendingAuthorization {
    /// Generate a fresh state (16 chars) and verifier (64 chars)
    ///
    /// # Errors
    /// Returns [`PkceError::RandomUnavailable`] if the OS random source fails.
    pub fn generate() -> Result<Self, PkceError> {
        let state = generate_random_string(STATE_LENGTH)?;
        let code_verifier = generate_random_string(CODE_VERIFIER_LENGTH)?;
        Ok(Self { state, code_verifier })
    }

    /// `BASE64URL(SHA256(code_verifier))`
    #[must_use]
    pub fn code_challenge(&self) -> String {
        derive_challenge(&self.code_verifier)
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        CODE_CHALLENGE_METHOD
    }
}

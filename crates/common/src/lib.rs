//! Modular common utilities shared across Spoticizr crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: pure helpers (PKCE primitives, token types)
//! - `runtime`: async infrastructure (clock abstraction, tracing)
//! - `platform`: the OAuth 2.0 + PKCE session core (relay client, token
//!   lifecycle, logout)
//! - `test-utils`: in-memory mocks for downstream crates' tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod time;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "platform", feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "platform")]
pub use auth::{AuthSession, AuthSessionError, TokenSet};
#[cfg(feature = "runtime")]
pub use time::{Clock, SystemClock};

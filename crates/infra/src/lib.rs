//! # Spoticizr Infrastructure
//!
//! Concrete adapters around the auth core in `spoticizr-common`.
//!
//! This crate contains:
//! - Configuration loading (`.env`, environment, TOML/JSON files)
//! - File-backed client storage
//! - The token relay HTTP service and its token endpoint client
//! - The loopback receiver for authorization redirects
//! - The authorized Web API client
//!
//! ## Architecture
//! - Implements traits defined in `spoticizr-common::auth`
//! - Depends on `spoticizr-domain` and `spoticizr-common`
//! - Contains all "impure" code (file system, sockets, HTTP)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod oauth;
pub mod relay;
pub mod storage;

// Re-export commonly used items
pub use api::{AccessTokenProvider, ApiError, SpotifyApiClient, UserProfile};
pub use errors::InfraError;
pub use http::HttpClient;
pub use oauth::RedirectReceiver;
pub use relay::{RelayState, TokenEndpointClient};
pub use storage::FileStorage;

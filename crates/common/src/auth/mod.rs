//! OAuth 2.0 Authorization Code + PKCE session core
//!
//! Runs the browser-side half of the login flow against a trusted backend
//! relay that holds the client secret, and keeps the resulting tokens fresh.
//!
//! # Features
//!
//! - **PKCE Flow**: RFC 7636 verifier/challenge with an OS CSPRNG
//! - **State Validation**: constant-time anti-CSRF check before any exchange
//! - **Token Lifecycle**: restore on start, renew ahead of expiry, coalesced
//!   refresh, logout on unrecoverable failure
//! - **Injected Environment**: storage, relay, navigation and clock are
//!   traits, so the state machines run against in-memory fakes in tests
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   AuthSession   │  Orchestrator (owns the scheduler task)
//! └────────┬────────┘
//!          │
//!          ├──► AuthorizationBuilder  (state + verifier, authorize URL)
//!          ├──► CallbackHandler       (redirect state machine)
//!          │         │
//!          │         └──► RelayClient (code exchange)
//!          └──► TokenManager          (current token, refresh, scheduler)
//!                    │
//!                    ├──► RelayClient      (refresh)
//!                    └──► SessionTeardown  (logout)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use spoticizr_common::auth::{AuthSession, Navigator, RelayClient, Route};
//! use spoticizr_common::testing::MockStorage;
//! use spoticizr_common::SystemClock;
//! use spoticizr_domain::Config;
//!
//! struct PrintNavigator;
//!
//! impl Navigator for PrintNavigator {
//!     fn navigate(&self, route: Route) {
//!         println!("navigate: {}", route.as_str());
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new("your_client_id", "http://127.0.0.1:8888/callback");
//!     let relay = Arc::new(RelayClient::new(&config.client.relay_url, config.client.http_timeout())?);
//!
//!     let session = AuthSession::new(
//!         config,
//!         relay,
//!         Arc::new(MockStorage::new()), // hosts pass a persistent store here
//!         Arc::new(PrintNavigator),
//!         Arc::new(SystemClock),
//!     );
//!
//!     session.start().await?;
//!     let request = session.begin_login()?;
//!     println!("Open this URL in your browser: {}", request.url);
//!
//!     // ... the provider redirects back; feed the redirect to the session ...
//!
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: `TokenSet`, token endpoint shapes, redirect event
//! - **[`pkce`]**: random strings, challenge derivation, state comparison
//! - **[`client`]**: HTTP client for the backend relay
//! - **[`storage`]**: persisted key layout and in-memory storage
//! - **[`authorize`]**: authorization request builder
//! - **[`callback`]**: callback handler state machine
//! - **[`token_manager`]**: token lifecycle and renewal scheduler
//! - **[`teardown`]**: logout
//! - **[`service`]**: session orchestrator

pub mod authorize;
pub mod callback;
pub mod client;
pub mod pkce;
pub mod service;
pub mod storage;
pub mod teardown;
pub mod token_manager;
pub mod traits;
pub mod types;

// Re-export commonly used types and functions
pub use authorize::{AuthorizationBuilder, AuthorizeError};
pub use callback::{CallbackHandler, CallbackOutcome, CallbackPhase, CallbackRejection};
pub use client::{RelayClient, RelayClientError};
pub use pkce::{
    derive_challenge, generate_random_string, validate_code_verifier, validate_state,
    PendingAuthorization, PkceError,
};
pub use service::{AuthSession, AuthSessionError};
pub use storage::StorageError;
pub use teardown::SessionTeardown;
pub use token_manager::{TokenManager, TokenManagerError};
pub use traits::{ClientStorage, Navigator, RelayClientTrait, Route};
pub use types::{
    AuthorizationRedirect, AuthorizationRequest, OAuthError, TokenResponse, TokenSet,
};

//! Token relay
//!
//! The trusted backend half of the login flow. It performs the provider's
//! token endpoint calls so the login client never talks to the token
//! endpoint directly.

pub mod server;
pub mod token_endpoint;

pub use server::{router, serve, RelayState};
pub use token_endpoint::{TokenEndpointClient, TokenEndpointError};

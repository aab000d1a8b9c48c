//! # Spoticizr Domain
//!
//! Domain types shared by every Spoticizr crate.
//!
//! This crate contains:
//! - The cross-crate error type and `Result` alias
//! - Configuration structures for the login client and the token relay
//! - Protocol constants (persisted keys, default scopes, provider endpoints)
//!
//! ## Architecture
//! - No dependencies on other Spoticizr crates
//! - Only external dependencies allowed
//! - Pure data structures

pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used items
pub use config::*;
pub use errors::*;

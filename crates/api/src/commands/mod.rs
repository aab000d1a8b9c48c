//! CLI commands
//!
//! Each command renders its stdout output as a `String`; `main` prints it.
//! Diagnostics go through `tracing` to stderr.

pub mod login;
pub mod logout;
pub mod me;
pub mod relay;
pub mod status;
pub mod token;

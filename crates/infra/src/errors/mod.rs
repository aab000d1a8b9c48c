//! Infrastructure-side error plumbing.

pub mod conversions;

pub use conversions::{map_auth_session_error, map_callback_rejection, InfraError};

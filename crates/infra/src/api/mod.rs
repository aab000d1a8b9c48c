//! Spotify Web API access
//!
//! Bearer-authorized requests on top of [`crate::http::HttpClient`], with
//! the 401 → refresh → single retry → sign-out rule applied in one place.

pub mod auth;
pub mod client;
pub mod errors;

pub use auth::AccessTokenProvider;
pub use client::{SpotifyApiClient, UserProfile};
pub use errors::{ApiError, ApiErrorCategory};

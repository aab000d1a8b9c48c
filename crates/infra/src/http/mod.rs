//! Outbound Web API transport with rate-limit aware retries.

pub mod client;

pub use client::{HttpClient, HttpClientBuilder, RetryPolicy};

//! Persistent client storage
//!
//! Durable [`ClientStorage`](spoticizr_common::auth::ClientStorage)
//! implementations for hosts that keep a session across restarts.

pub mod file_storage;

pub use file_storage::FileStorage;

//! Testing utilities and helpers
//!
//! In-memory stand-ins for the session core's environment:
//! - **[`mocks`]**: storage, relay client and navigator fakes
//! - **[`time`]**: controllable wall clocks
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use spoticizr_common::testing::{MockClock, MockRelayClient, MockStorage, RecordingNavigator};
//! use spoticizr_common::Clock;
//!
//! let clock = MockClock::at_millis(1_700_000_000_000);
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now().timestamp_millis(), 1_700_000_005_000);
//!
//! let relay = Arc::new(MockRelayClient::new());
//! relay.fail_refresh(400, "invalid_grant");
//!
//! let storage = MockStorage::new();
//! let navigator = RecordingNavigator::new();
//! assert!(storage.is_empty());
//! assert!(navigator.routes().is_empty());
//! ```

pub mod mocks;
pub mod time;

pub use mocks::{MockRelayClient, MockStorage, RecordingNavigator};
pub use time::{MockClock, TokioClock};

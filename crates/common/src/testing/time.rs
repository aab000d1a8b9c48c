//! Controllable wall clocks
//!
//! [`MockClock`] only moves when told to. [`TokioClock`] follows tokio's
//! (pausable) clock, so `tokio::time::advance` and auto-advance in
//! `start_paused` tests move wall time and timers together.

// Allow missing panics docs for time utilities - mutex poisoning fails the test anyway
#![allow(clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::time::Clock;

/// Mock clock for deterministic testing
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use spoticizr_common::testing::MockClock;
/// use spoticizr_common::Clock;
///
/// let clock = MockClock::at_millis(0);
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.millis_since_epoch(), 10_000);
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    /// Create a mock clock frozen at `millis` since the UNIX epoch
    pub fn at_millis(millis: i64) -> Self {
        Self::new(Utc.timestamp_millis_opt(millis).single().unwrap_or_default())
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        // Test utility: panic on poisoned mutex to fail tests early
        let mut now = self.now.lock().expect("mutex poisoned");
        *now += chrono::Duration::from_std(duration).expect("duration out of range");
    }

    /// Jump to an absolute time
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().expect("mutex poisoned") = at;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        // Test utility: panic on poisoned mutex to fail tests early
        *self.now.lock().expect("mutex poisoned")
    }
}

/// Wall clock derived from tokio's clock
///
/// Reports `anchor + (tokio::time::Instant::now() - created)`. Create it
/// inside the runtime whose clock it should follow.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    anchor: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new(anchor: DateTime<Utc>) -> Self {
        Self { anchor, origin: tokio::time::Instant::now() }
    }

    /// tokio instant corresponding to wall time `at`
    #[must_use]
    pub fn instant_at(&self, at: DateTime<Utc>) -> tokio::time::Instant {
        let offset = (at - self.anchor).to_std().unwrap_or(Duration::ZERO);
        self.origin + offset
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = tokio::time::Instant::now().duration_since(self.origin);
        self.anchor + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero())
    }
}

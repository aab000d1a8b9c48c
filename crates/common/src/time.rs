//! Wall-clock abstraction
//!
//! Token expiry is an absolute wall-clock timestamp, so everything that
//! compares against `expires_at` reads time through [`Clock`]. Production code
//! uses [`SystemClock`]; tests inject `testing::MockClock` or
//! `testing::TokioClock`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time
pub trait Clock: Send + Sync + 'static {
    /// Current UTC time
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since the UNIX epoch
    fn millis_since_epoch(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Implement Clock for Arc<T> where T: Clock for convenient cloning
impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

//! Time source for turnover computations.

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Every derived value (elapsed, remaining, progress) is a function of
/// `now()`, so swapping the clock is all tests need to move through a
/// cleaning cycle.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

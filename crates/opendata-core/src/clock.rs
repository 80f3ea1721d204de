//! Clock abstraction for deterministic time.

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Production code uses [`SystemClock`]; tests substitute fixed or
/// adjustable implementations so timestamps are deterministic.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

//! Clock abstraction for determinism.

use chrono::{DateTime, Utc};

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Time left until `deadline`, or `None` once it has passed.
    fn remaining_until(&self, deadline: DateTime<Utc>) -> Option<std::time::Duration> {
        let remaining = deadline - self.now();
        if remaining <= chrono::TimeDelta::zero() {
            return None;
        }
        remaining.to_std().ok()
    }
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

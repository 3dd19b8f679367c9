use chrono::{NaiveDateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex};

/// Wall-clock abstraction for scheduling decisions across the stack.
///
/// - now(): current UTC time as a naive timestamp (the storage representation)
/// - hours_since(): helper for reminder thresholds
pub trait Clock {
    fn now(&self) -> NaiveDateTime;

    /// Whole hours elapsed since `earlier`, saturating at 0 when `earlier` is in the future.
    fn hours_since(&self, earlier: NaiveDateTime) -> i64 {
        self.now().signed_duration_since(earlier).num_hours().max(0)
    }
}

/// Default clock backed by the system time, truncated to millisecond precision.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> NaiveDateTime {
        use chrono::Timelike;
        let now = Utc::now().naive_utc();
        let millis = now.nanosecond() / 1_000_000;
        now.with_nanosecond(millis * 1_000_000).unwrap_or(now)
    }
}

/// Deterministic clock whose time is set or advanced manually.
///
/// Clones share the same instant, so a test can hand one copy to the code under
/// test and keep another to move time forward.
#[derive(Debug, Clone)]
pub struct FixedClock {
    at: Arc<Mutex<NaiveDateTime>>,
}

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self {
            at: Arc::new(Mutex::new(at)),
        }
    }

    /// Advance the clock by the given delta.
    pub fn advance(&self, d: TimeDelta) {
        if let Ok(mut at) = self.at.lock() {
            *at = at.checked_add_signed(d).unwrap_or(*at);
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: NaiveDateTime) {
        if let Ok(mut at) = self.at.lock() {
            *at = to;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.at
            .lock()
            .map(|g| *g)
            .unwrap_or(NaiveDateTime::MIN)
    }
}

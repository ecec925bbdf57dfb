//! Abstraction over the wall clock, injectable for deterministic tests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time, expressed as milliseconds since the Unix epoch.
///
/// Every timing decision in the cache (TTL, sliding refresh, stale window) goes
/// through this trait rather than calling `SystemTime::now()` directly, so tests
/// can swap in a [`ManualClock`] and advance time without sleeping.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Default clock source backed by the real system clock.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before Unix epoch")
            .as_millis() as i64
    }
}

/// A shared handle to a [`ClockSource`], the form every component actually holds.
pub type Clock = Arc<dyn ClockSource>;

/// Returns a [`Clock`] backed by the real system clock.
#[must_use]
pub fn system_clock() -> Clock {
    Arc::new(SystemClock)
}

/// A clock whose value is set explicitly, for deterministic tests of TTL, sliding
/// expiration, and stale-window logic without real sleeps.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a clock starting at `initial_millis`.
    #[must_use]
    pub fn new(initial_millis: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(initial_millis)),
        }
    }

    /// Sets the clock to an absolute value.
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::Relaxed);
    }

    /// Advances the clock by `delta_millis` (which may be negative).
    pub fn advance(&self, delta_millis: i64) {
        self.millis.fetch_add(delta_millis, Ordering::Relaxed);
    }
}

impl ClockSource for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::Relaxed)
    }
}

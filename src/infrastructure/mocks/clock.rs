//! Mock clock for testing.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Clock whose time only moves when told to.
///
/// Windows and cooldowns span minutes; with a `MockClock` a test walks
/// through them instantly and deterministically.
///
/// # Examples
///
/// ```
/// use error_throttle::infrastructure::mocks::MockClock;
/// use error_throttle::{LimiterConfig, RateLimiter};
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
///
/// let clock = MockClock::new(Instant::now());
/// let config = LimiterConfig::from_millis(1, 60_000, 300_000).unwrap();
/// let limiter = RateLimiter::with_clock(config, Arc::new(clock.clone()));
///
/// assert!(limiter.should_log("boom", None));
/// assert!(!limiter.should_log("boom", None));
///
/// // Five minutes of silence end the cooldown
/// clock.advance(Duration::from_secs(301));
/// assert!(limiter.should_log("boom", None));
/// ```
///
/// # Thread Safety
///
/// Clones share the same time value, so advancing one clone advances all.
#[derive(Debug, Clone)]
pub struct MockClock {
    current_time: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Create a mock clock starting at a specific instant.
    pub fn new(start: Instant) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    fn time(&self) -> MutexGuard<'_, Instant> {
        self.current_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        *self.time() += duration;
    }

    /// Advance the clock by a number of milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Set the clock to a specific instant.
    pub fn set(&self, instant: Instant) {
        *self.time() = instant;
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.time()
    }
}

//! Admission policy for error occurrences.
//!
//! Decides, for one signature, whether the next occurrence is forwarded or
//! suppressed. Checks run in a fixed order, and the order is what produces the
//! cooldown hysteresis:
//!
//! 1. No counter yet: open a window, admit.
//! 2. Ceiling reached and the last occurrence is younger than the cooldown:
//!    suppress, refresh `last_seen`, keep the window and count.
//! 3. Window older than `window`: open a new window, admit.
//! 4. Otherwise count the occurrence and admit while `count <= max`.
//!
//! Because step 2 runs before step 3, a tripped signature stays suppressed
//! for a full cooldown measured from its most recent occurrence, even if the
//! counting window would have expired sooner.

use crate::domain::counter::WindowCounter;
use crate::domain::signature::ErrorSignature;
use crate::domain::status::RateLimitStatus;
use std::time::{Duration, Instant};

/// Decision made by the admission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Forward the occurrence
    Allow,
    /// Drop the occurrence
    Suppress,
}

impl PolicyDecision {
    /// Check if this decision is Allow.
    pub fn is_allow(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }

    /// Check if this decision is Suppress.
    pub fn is_suppress(&self) -> bool {
        matches!(self, PolicyDecision::Suppress)
    }
}

/// Error returned when a limiter configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// `max_occurrences` must be greater than zero
    ZeroMaxOccurrences,
    /// The counting window must be greater than zero
    ZeroWindow,
    /// The cooldown must be greater than zero
    ZeroCooldown,
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::ZeroMaxOccurrences => write!(f, "max_occurrences must be greater than 0"),
            PolicyError::ZeroWindow => write!(f, "window duration must be greater than 0"),
            PolicyError::ZeroCooldown => write!(f, "cooldown duration must be greater than 0"),
        }
    }
}

impl std::error::Error for PolicyError {}

/// Immutable configuration of one limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterConfig {
    max_occurrences: u32,
    window: Duration,
    cooldown: Duration,
}

impl LimiterConfig {
    /// Create a validated configuration.
    ///
    /// # Arguments
    /// * `max_occurrences` - Occurrences admitted per window before suppression
    /// * `window` - Period over which occurrences are counted
    /// * `cooldown` - Quiet time required after the ceiling is hit
    ///
    /// # Errors
    /// Returns `PolicyError` if any value is zero.
    pub fn new(max_occurrences: u32, window: Duration, cooldown: Duration) -> Result<Self, PolicyError> {
        if max_occurrences == 0 {
            return Err(PolicyError::ZeroMaxOccurrences);
        }
        if window.is_zero() {
            return Err(PolicyError::ZeroWindow);
        }
        if cooldown.is_zero() {
            return Err(PolicyError::ZeroCooldown);
        }
        Ok(Self {
            max_occurrences,
            window,
            cooldown,
        })
    }

    /// Create a configuration from millisecond values.
    ///
    /// # Errors
    /// Returns `PolicyError` if any value is zero.
    pub fn from_millis(max_occurrences: u32, window_ms: u64, cooldown_ms: u64) -> Result<Self, PolicyError> {
        Self::new(
            max_occurrences,
            Duration::from_millis(window_ms),
            Duration::from_millis(cooldown_ms),
        )
    }

    const fn preset(max_occurrences: u32, window_secs: u64, cooldown_secs: u64) -> Self {
        Self {
            max_occurrences,
            window: Duration::from_secs(window_secs),
            cooldown: Duration::from_secs(cooldown_secs),
        }
    }

    /// General errors: 5 per 60s, 300s cooldown.
    pub const fn general() -> Self {
        Self::preset(5, 60, 300)
    }

    /// API errors: 10 per 60s, 180s cooldown.
    pub const fn api() -> Self {
        Self::preset(10, 60, 180)
    }

    /// Network errors: 3 per 30s, 120s cooldown.
    pub const fn network() -> Self {
        Self::preset(3, 30, 120)
    }

    /// Validation errors: 15 per 60s, 60s cooldown.
    pub const fn validation() -> Self {
        Self::preset(15, 60, 60)
    }

    /// Ceiling before suppression begins.
    pub fn max_occurrences(&self) -> u32 {
        self.max_occurrences
    }

    /// Counting window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Cooldown length.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Idle time after which a counter can be dropped (`window + cooldown`).
    pub fn retention(&self) -> Duration {
        self.window.saturating_add(self.cooldown)
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self::general()
    }
}

/// Outcome of one admission decision: the verdict and the counter to store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Whether the occurrence is forwarded
    pub decision: PolicyDecision,
    /// Counter state after this occurrence
    pub next: WindowCounter,
}

impl Admission {
    /// Check if the occurrence was admitted.
    pub fn admitted(&self) -> bool {
        self.decision.is_allow()
    }
}

/// Windowed counting with cooldown.
///
/// # Example
/// ```
/// use error_throttle::{AdmissionPolicy, ErrorSignature, LimiterConfig};
/// use std::time::{Duration, Instant};
///
/// let policy = AdmissionPolicy::new(LimiterConfig::from_millis(2, 1_000, 5_000).unwrap());
/// let sig = ErrorSignature::simple("boom");
/// let t0 = Instant::now();
///
/// let first = policy.decide(None, sig, t0);
/// let second = policy.decide(Some(&first.next), sig, t0);
/// let third = policy.decide(Some(&second.next), sig, t0);
///
/// assert!(first.admitted() && second.admitted());
/// assert!(!third.admitted());
///
/// // Still cooling down two seconds later, although the window has expired
/// let later = policy.decide(Some(&third.next), sig, t0 + Duration::from_secs(2));
/// assert!(!later.admitted());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdmissionPolicy {
    config: LimiterConfig,
}

impl AdmissionPolicy {
    /// Create a policy from a configuration.
    pub fn new(config: LimiterConfig) -> Self {
        Self { config }
    }

    /// The configuration this policy enforces.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Decide on one occurrence of `signature` at `now`.
    pub fn decide(
        &self,
        existing: Option<&WindowCounter>,
        signature: ErrorSignature,
        now: Instant,
    ) -> Admission {
        let Some(counter) = existing.copied() else {
            return Admission {
                decision: PolicyDecision::Allow,
                next: WindowCounter::first(signature, now),
            };
        };

        if self.is_cooling_down(&counter, now) {
            return Admission {
                decision: PolicyDecision::Suppress,
                next: counter.touch(now),
            };
        }

        if counter.window_age(now) > self.config.window {
            return Admission {
                decision: PolicyDecision::Allow,
                next: counter.restart(now),
            };
        }

        let next = counter.bump(now);
        let decision = if next.count() <= self.config.max_occurrences {
            PolicyDecision::Allow
        } else {
            PolicyDecision::Suppress
        };
        Admission { decision, next }
    }

    /// Read-only status of a counter at `now`.
    ///
    /// Advisory: a counter whose cooldown has run out keeps its stale count
    /// until the next occurrence resets it.
    pub fn status(&self, counter: Option<&WindowCounter>, now: Instant) -> RateLimitStatus {
        let Some(counter) = counter else {
            return RateLimitStatus::default();
        };

        let time_until_reset = self.config.window.saturating_sub(counter.window_age(now));
        let time_until_cooldown_end = if self.at_ceiling(counter) {
            self.config.cooldown.saturating_sub(counter.idle_for(now))
        } else {
            Duration::ZERO
        };

        RateLimitStatus {
            is_rate_limited: self.at_ceiling(counter) && !time_until_cooldown_end.is_zero(),
            count: counter.count(),
            time_until_reset,
            time_until_cooldown_end,
        }
    }

    /// Check if a counter has been idle longer than `window + cooldown`.
    pub fn is_stale(&self, counter: &WindowCounter, now: Instant) -> bool {
        counter.idle_for(now) > self.config.retention()
    }

    /// Check if a counter saw an occurrence within the last window.
    pub fn is_active(&self, counter: &WindowCounter, now: Instant) -> bool {
        counter.idle_for(now) < self.config.window
    }

    fn at_ceiling(&self, counter: &WindowCounter) -> bool {
        counter.count() >= self.config.max_occurrences
    }

    fn is_cooling_down(&self, counter: &WindowCounter, now: Instant) -> bool {
        self.at_ceiling(counter) && counter.idle_for(now) < self.config.cooldown
    }
}

//! Rate limiter coordination logic.
//!
//! A `RateLimiter` is one independently configured admission gate: it derives
//! signatures, runs the admission policy against the stored counters and
//! keeps the counter map bounded through sweeps.

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Storage};
use crate::application::store::SignatureStore;
use crate::domain::{
    counter::WindowCounter,
    policy::{AdmissionPolicy, LimiterConfig, PolicyDecision},
    signature::{ErrorContext, ErrorLike, ErrorSignature},
    status::{LimiterStats, RateLimitStatus},
};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::storage::ShardedStorage;
use std::sync::Arc;
use std::time::Instant;

/// Storage used by limiters built without an explicit backend.
pub type DefaultStorage = Arc<ShardedStorage<ErrorSignature, WindowCounter>>;

/// One admission gate with a fixed configuration.
///
/// Cloning is cheap and clones share state.
///
/// # Example
/// ```
/// use error_throttle::{LimiterConfig, RateLimiter};
///
/// let limiter = RateLimiter::new(LimiterConfig::from_millis(2, 60_000, 300_000).unwrap());
///
/// assert!(limiter.should_log("connection reset", None));
/// assert!(limiter.should_log("connection reset", None));
/// assert!(!limiter.should_log("connection reset", None));
///
/// // Other errors are counted separately
/// assert!(limiter.should_log("disk full", None));
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter<S = DefaultStorage>
where
    S: Storage<ErrorSignature, WindowCounter> + Clone,
{
    store: SignatureStore<S>,
    policy: AdmissionPolicy,
    metrics: Metrics,
}

impl RateLimiter<DefaultStorage> {
    /// Create a limiter with sharded in-memory storage and the system clock.
    pub fn new(config: LimiterConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create a limiter with sharded in-memory storage and a custom clock.
    pub fn with_clock(config: LimiterConfig, clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(Arc::new(ShardedStorage::new()), clock, config)
    }
}

impl<S> RateLimiter<S>
where
    S: Storage<ErrorSignature, WindowCounter> + Clone,
{
    /// Create a limiter over an arbitrary storage backend.
    pub fn from_parts(storage: S, clock: Arc<dyn Clock>, config: LimiterConfig) -> Self {
        Self {
            store: SignatureStore::new(storage, clock),
            policy: AdmissionPolicy::new(config),
            metrics: Metrics::new(),
        }
    }

    /// Decide whether an occurrence should be forwarded.
    ///
    /// Derives the signature of `error` (plus the allow-listed `context`
    /// fields) and records the occurrence. Never fails.
    pub fn should_log<'e>(&self, error: impl Into<ErrorLike<'e>>, context: Option<&ErrorContext>) -> bool {
        let error = error.into();
        self.check_signature(ErrorSignature::derive(&error, context))
            .is_allow()
    }

    /// Record one occurrence of a pre-derived signature.
    ///
    /// # Performance
    /// The decision runs under the shard lock of the signature's key;
    /// occurrences of other signatures proceed in parallel.
    pub fn check_signature(&self, signature: ErrorSignature) -> PolicyDecision {
        let max = self.policy.config().max_occurrences();
        let admission = self.store.with_counter(signature, |existing, now| {
            let admission = self.policy.decide(existing, signature, now);
            (admission.next, admission)
        });

        match admission.decision {
            PolicyDecision::Allow => {
                self.metrics.record_admitted();
                if admission.next.count() == max {
                    tracing::debug!(
                        signature = %signature,
                        max_occurrences = max,
                        cooldown_ms = self.policy.config().cooldown().as_millis() as u64,
                        "error signature reached its ceiling, further occurrences will be suppressed"
                    );
                }
            }
            PolicyDecision::Suppress => self.metrics.record_suppressed(),
        }

        admission.decision
    }

    /// Read-only status of the signature of `error`.
    ///
    /// Advisory: does not advance any window. A signature whose cooldown
    /// has run out keeps reporting its old count until its next occurrence.
    pub fn status<'e>(&self, error: impl Into<ErrorLike<'e>>, context: Option<&ErrorContext>) -> RateLimitStatus {
        let error = error.into();
        self.signature_status(ErrorSignature::derive(&error, context))
    }

    /// Read-only status of a pre-derived signature.
    pub fn signature_status(&self, signature: ErrorSignature) -> RateLimitStatus {
        let counter = self.store.counter(&signature);
        self.policy.status(counter.as_ref(), self.store.now())
    }

    /// Aggregate statistics over every tracked signature.
    pub fn stats(&self) -> LimiterStats {
        let now = self.store.now();
        let mut stats = LimiterStats::default();
        self.store.for_each(|counter| {
            stats.total_unique_signatures += 1;
            stats.total_occurrences += u64::from(counter.count());
            if self.policy.is_active(counter, now) {
                stats.active_signatures += 1;
            }
            if self.policy.status(Some(counter), now).is_rate_limited {
                stats.rate_limited_signatures += 1;
            }
        });
        stats
    }

    /// Remove counters idle for longer than `window + cooldown`.
    ///
    /// Returns the number of counters removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(self.store.now())
    }

    /// Sweep as of `now`.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let removed = self
            .store
            .retain(|counter| !self.policy.is_stale(counter, now));
        if removed > 0 {
            self.metrics.record_swept(removed);
            tracing::debug!(
                removed,
                remaining = self.store.len(),
                "swept stale error signatures"
            );
        }
        removed
    }

    /// Forget the signature of `error`. Returns true if it was tracked.
    pub fn reset_signature<'e>(&self, error: impl Into<ErrorLike<'e>>, context: Option<&ErrorContext>) -> bool {
        let error = error.into();
        self.store.remove(&ErrorSignature::derive(&error, context))
    }

    /// Forget every signature.
    pub fn reset_all(&self) {
        self.store.clear();
    }

    /// Number of tracked signatures.
    pub fn signature_count(&self) -> usize {
        self.store.len()
    }

    /// The configuration this limiter enforces.
    pub fn config(&self) -> &LimiterConfig {
        self.policy.config()
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

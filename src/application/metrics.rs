//! Observability counters for admission decisions.
//!
//! Cumulative totals since construction (or the last `reset`). Unlike the
//! per-signature counters these are never swept.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cumulative admission metrics.
///
/// Each limiter owns one instance; clones share its counters.
/// `LimiterRegistry::metrics_snapshot` sums the instances of every category.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    occurrences_admitted: AtomicU64,
    occurrences_suppressed: AtomicU64,
    signatures_swept: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                occurrences_admitted: AtomicU64::new(0),
                occurrences_suppressed: AtomicU64::new(0),
                signatures_swept: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_admitted(&self) {
        self.inner.occurrences_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_suppressed(&self) {
        self.inner.occurrences_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swept(&self, count: usize) {
        self.inner
            .signatures_swept
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Total number of occurrences forwarded.
    pub fn occurrences_admitted(&self) -> u64 {
        self.inner.occurrences_admitted.load(Ordering::Relaxed)
    }

    /// Total number of occurrences dropped.
    pub fn occurrences_suppressed(&self) -> u64 {
        self.inner.occurrences_suppressed.load(Ordering::Relaxed)
    }

    /// Total number of stale counters removed by sweeps.
    pub fn signatures_swept(&self) -> u64 {
        self.inner.signatures_swept.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            occurrences_admitted: self.occurrences_admitted(),
            occurrences_suppressed: self.occurrences_suppressed(),
            signatures_swept: self.signatures_swept(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.occurrences_admitted.store(0, Ordering::Relaxed);
        self.inner.occurrences_suppressed.store(0, Ordering::Relaxed);
        self.inner.signatures_swept.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// Occurrences forwarded
    pub occurrences_admitted: u64,
    /// Occurrences dropped
    pub occurrences_suppressed: u64,
    /// Stale counters removed
    pub signatures_swept: u64,
}

impl MetricsSnapshot {
    /// Fraction of occurrences that were suppressed (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been decided yet.
    pub fn suppression_rate(&self) -> f64 {
        let total = self.total_occurrences();
        if total == 0 {
            0.0
        } else {
            self.occurrences_suppressed as f64 / total as f64
        }
    }

    /// Admitted plus suppressed.
    pub fn total_occurrences(&self) -> u64 {
        self.occurrences_admitted
            .saturating_add(self.occurrences_suppressed)
    }
}

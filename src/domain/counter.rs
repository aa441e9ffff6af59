//! Per-signature occurrence counter.

use crate::domain::signature::ErrorSignature;
use std::time::{Duration, Instant};

/// Occurrence bookkeeping for one signature inside one limiter.
///
/// Invariants: `count >= 1` and `last_seen >= window_start`. Only the
/// admission policy moves a counter forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCounter {
    signature: ErrorSignature,
    window_start: Instant,
    count: u32,
    last_seen: Instant,
}

impl WindowCounter {
    /// Counter for the first occurrence of a signature.
    pub fn first(signature: ErrorSignature, now: Instant) -> Self {
        Self {
            signature,
            window_start: now,
            count: 1,
            last_seen: now,
        }
    }

    /// The signature this counter belongs to.
    pub fn signature(&self) -> ErrorSignature {
        self.signature
    }

    /// Start of the current counting window.
    pub fn window_start(&self) -> Instant {
        self.window_start
    }

    /// Occurrences counted in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Time of the most recent occurrence.
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    /// Time elapsed since the window opened.
    pub fn window_age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.window_start)
    }

    /// Time elapsed since the most recent occurrence.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    /// Open a fresh window at `now`.
    pub(crate) fn restart(self, now: Instant) -> Self {
        Self::first(self.signature, now)
    }

    /// Count one more occurrence in the current window.
    pub(crate) fn bump(self, now: Instant) -> Self {
        Self {
            count: self.count.saturating_add(1),
            last_seen: self.last_seen.max(now),
            ..self
        }
    }

    /// Record an occurrence without counting it.
    pub(crate) fn touch(self, now: Instant) -> Self {
        Self {
            last_seen: self.last_seen.max(now),
            ..self
        }
    }
}

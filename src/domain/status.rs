//! Read-only views of limiter state.

use std::time::Duration;

/// Rate limit status of one signature at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateLimitStatus {
    /// Ceiling reached and cooldown not yet over
    pub is_rate_limited: bool,
    /// Occurrences counted in the current window
    pub count: u32,
    /// Time left in the current counting window
    pub time_until_reset: Duration,
    /// Time left in the cooldown (zero below the ceiling)
    pub time_until_cooldown_end: Duration,
}

/// Aggregate statistics of one limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LimiterStats {
    /// Signatures currently tracked
    pub total_unique_signatures: usize,
    /// Signatures seen within the last window
    pub active_signatures: usize,
    /// Signatures currently rate limited
    pub rate_limited_signatures: usize,
    /// Sum of the counts of all tracked signatures
    pub total_occurrences: u64,
}

impl LimiterStats {
    /// Combine two sets of statistics.
    pub fn merge(self, other: LimiterStats) -> LimiterStats {
        LimiterStats {
            total_unique_signatures: self.total_unique_signatures + other.total_unique_signatures,
            active_signatures: self.active_signatures + other.active_signatures,
            rate_limited_signatures: self.rate_limited_signatures + other.rate_limited_signatures,
            total_occurrences: self.total_occurrences.saturating_add(other.total_occurrences),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let a = LimiterStats {
            total_unique_signatures: 2,
            active_signatures: 1,
            rate_limited_signatures: 1,
            total_occurrences: 7,
        };
        let b = LimiterStats {
            total_unique_signatures: 3,
            active_signatures: 3,
            rate_limited_signatures: 0,
            total_occurrences: 4,
        };

        let merged = a.merge(b);
        assert_eq!(merged.total_unique_signatures, 5);
        assert_eq!(merged.active_signatures, 4);
        assert_eq!(merged.rate_limited_signatures, 1);
        assert_eq!(merged.total_occurrences, 11);
        assert_eq!(LimiterStats::default().merge(a), a);
    }
}

//! Named limiters routed by category.
//!
//! The registry holds a fixed set of independently configured limiters,
//! created once at startup. Occurrences are routed by category name; an
//! unknown category falls back to a designated limiter.

use crate::application::limiter::RateLimiter;
use crate::application::metrics::MetricsSnapshot;
use crate::application::ports::Clock;
use crate::domain::{
    policy::LimiterConfig,
    signature::{ErrorContext, ErrorLike},
    status::{LimiterStats, RateLimitStatus},
};
use crate::infrastructure::clock::SystemClock;
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "async")]
use crate::application::sweeper::{Sweeper, SweeperConfig, SweeperHandle};

/// Category for errors without a more specific home.
pub const GENERAL: &str = "general";
/// Category for failed API calls.
pub const API: &str = "api";
/// Category for connectivity failures.
pub const NETWORK: &str = "network";
/// Category for input validation failures.
pub const VALIDATION: &str = "validation";

/// Error returned when building a registry fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// At least one category must be configured
    NoCategories,
    /// Category names must not be empty
    EmptyCategoryName,
    /// The fallback category is not among the configured ones
    UnknownFallbackCategory(String),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::NoCategories => write!(f, "at least one category must be configured"),
            BuildError::EmptyCategoryName => write!(f, "category name must not be empty"),
            BuildError::UnknownFallbackCategory(name) => {
                write!(f, "fallback category '{}' is not configured", name)
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// Builder for a [`LimiterRegistry`].
#[derive(Debug)]
pub struct LimiterRegistryBuilder {
    categories: Vec<(String, LimiterConfig)>,
    fallback: String,
    clock: Option<Arc<dyn Clock>>,
}

impl LimiterRegistryBuilder {
    /// Create a builder with no categories and `general` as fallback.
    pub fn new() -> Self {
        Self {
            categories: Vec::new(),
            fallback: GENERAL.to_string(),
            clock: None,
        }
    }

    /// Add a category, replacing any earlier one with the same name.
    pub fn with_category(mut self, name: impl Into<String>, config: LimiterConfig) -> Self {
        self.categories.push((name.into(), config));
        self
    }

    /// Add the `general`, `api`, `network` and `validation` categories with
    /// their default configurations.
    pub fn with_default_categories(self) -> Self {
        self.with_category(GENERAL, LimiterConfig::general())
            .with_category(API, LimiterConfig::api())
            .with_category(NETWORK, LimiterConfig::network())
            .with_category(VALIDATION, LimiterConfig::validation())
    }

    /// Set the category that receives occurrences of unknown categories.
    pub fn with_fallback_category(mut self, name: impl Into<String>) -> Self {
        self.fallback = name.into();
        self
    }

    /// Set a custom clock shared by every limiter (mainly for tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the registry.
    ///
    /// # Errors
    /// Returns `BuildError` if no category is configured, a category name is
    /// empty, or the fallback category is missing.
    pub fn build(self) -> Result<LimiterRegistry, BuildError> {
        if self.categories.is_empty() {
            return Err(BuildError::NoCategories);
        }
        if self.categories.iter().any(|(name, _)| name.is_empty()) {
            return Err(BuildError::EmptyCategoryName);
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let limiters: BTreeMap<String, RateLimiter> = self
            .categories
            .into_iter()
            .map(|(name, config)| (name, RateLimiter::with_clock(config, Arc::clone(&clock))))
            .collect();

        let fallback = limiters
            .get(&self.fallback)
            .cloned()
            .ok_or_else(|| BuildError::UnknownFallbackCategory(self.fallback.clone()))?;

        Ok(LimiterRegistry {
            inner: Arc::new(RegistryInner {
                limiters,
                fallback_name: self.fallback,
                fallback,
            }),
        })
    }
}

impl Default for LimiterRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct RegistryInner {
    limiters: BTreeMap<String, RateLimiter>,
    fallback_name: String,
    // Shares state with the entry of the same name in `limiters`
    fallback: RateLimiter,
}

/// A fixed set of named limiters.
///
/// Cloning is cheap and clones share state. Construct one at startup and
/// hand it to whatever reports errors.
///
/// # Example
/// ```
/// use error_throttle::application::registry;
/// use error_throttle::{ErrorContext, LimiterRegistry};
///
/// let limiters = LimiterRegistry::new();
/// let ctx = ErrorContext::new().with_component("sync");
///
/// // network: 3 per 30s
/// for _ in 0..3 {
///     assert!(limiters.log_error("socket closed", Some(&ctx), registry::NETWORK));
/// }
/// assert!(!limiters.log_error("socket closed", Some(&ctx), registry::NETWORK));
///
/// // Same error, separate budget in another category
/// assert!(limiters.log_error("socket closed", Some(&ctx), registry::GENERAL));
/// ```
#[derive(Debug, Clone)]
pub struct LimiterRegistry {
    inner: Arc<RegistryInner>,
}

impl LimiterRegistry {
    /// Registry with the four default categories and the system clock.
    pub fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let fallback = RateLimiter::with_clock(LimiterConfig::general(), Arc::clone(&clock));

        let mut limiters = BTreeMap::new();
        limiters.insert(GENERAL.to_string(), fallback.clone());
        for (name, config) in [
            (API, LimiterConfig::api()),
            (NETWORK, LimiterConfig::network()),
            (VALIDATION, LimiterConfig::validation()),
        ] {
            limiters.insert(name.to_string(), RateLimiter::with_clock(config, Arc::clone(&clock)));
        }

        Self {
            inner: Arc::new(RegistryInner {
                limiters,
                fallback_name: GENERAL.to_string(),
                fallback,
            }),
        }
    }

    /// Create a builder for a custom registry.
    pub fn builder() -> LimiterRegistryBuilder {
        LimiterRegistryBuilder::new()
    }

    /// Decide whether an occurrence should be forwarded.
    ///
    /// `None` and unknown categories use the fallback limiter.
    pub fn should_log<'e>(
        &self,
        error: impl Into<ErrorLike<'e>>,
        context: Option<&ErrorContext>,
        category: Option<&str>,
    ) -> bool {
        self.route(category).should_log(error, context)
    }

    /// Decide whether an occurrence in `category` should be forwarded.
    pub fn log_error<'e>(
        &self,
        error: impl Into<ErrorLike<'e>>,
        context: Option<&ErrorContext>,
        category: &str,
    ) -> bool {
        self.should_log(error, context, Some(category))
    }

    /// Read-only status of an error in a category.
    pub fn status<'e>(
        &self,
        error: impl Into<ErrorLike<'e>>,
        context: Option<&ErrorContext>,
        category: Option<&str>,
    ) -> RateLimitStatus {
        self.route(category).status(error, context)
    }

    /// Statistics of every limiter, keyed by category.
    pub fn all_stats(&self) -> BTreeMap<String, LimiterStats> {
        self.inner
            .limiters
            .iter()
            .map(|(name, limiter)| (name.clone(), limiter.stats()))
            .collect()
    }

    /// Reset one category, or every category when `None`.
    ///
    /// Resetting an unknown category does nothing.
    pub fn reset(&self, category: Option<&str>) {
        match category {
            None => self.inner.limiters.values().for_each(RateLimiter::reset_all),
            Some(name) => match self.inner.limiters.get(name) {
                Some(limiter) => limiter.reset_all(),
                None => tracing::debug!(category = name, "reset of unknown error category ignored"),
            },
        }
    }

    /// Sweep every limiter. Returns the total number of counters removed.
    pub fn sweep(&self) -> usize {
        self.inner.limiters.values().map(RateLimiter::sweep).sum()
    }

    /// Limiter of a category, without fallback.
    pub fn limiter(&self, category: &str) -> Option<&RateLimiter> {
        self.inner.limiters.get(category)
    }

    /// Configured category names, in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.inner.limiters.keys().map(String::as_str)
    }

    /// Name of the category used for unknown categories.
    pub fn fallback_category(&self) -> &str {
        &self.inner.fallback_name
    }

    /// Metrics summed across every limiter.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.inner
            .limiters
            .values()
            .map(|limiter| limiter.metrics().snapshot())
            .fold(MetricsSnapshot::default(), |acc, s| MetricsSnapshot {
                occurrences_admitted: acc.occurrences_admitted + s.occurrences_admitted,
                occurrences_suppressed: acc.occurrences_suppressed + s.occurrences_suppressed,
                signatures_swept: acc.signatures_swept + s.signatures_swept,
            })
    }

    /// Start a background sweeper for this registry.
    ///
    /// The sweeper stops when the returned handle is shut down or dropped.
    ///
    /// # Panics
    /// Panics if called outside of a tokio runtime.
    #[cfg(feature = "async")]
    pub fn spawn_sweeper(&self, config: SweeperConfig) -> SweeperHandle {
        Sweeper::new(self.clone(), config).start()
    }

    fn route(&self, category: Option<&str>) -> &RateLimiter {
        let Some(name) = category else {
            return &self.inner.fallback;
        };
        match self.inner.limiters.get(name) {
            Some(limiter) => limiter,
            None => {
                tracing::debug!(
                    category = name,
                    fallback = %self.inner.fallback_name,
                    "unknown error category, using fallback"
                );
                &self.inner.fallback
            }
        }
    }
}

impl Default for LimiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;
    use std::time::{Duration, Instant};

    fn registry_with_clock() -> (LimiterRegistry, MockClock) {
        let clock = MockClock::new(Instant::now());
        let registry = LimiterRegistry::builder()
            .with_default_categories()
            .with_clock(Arc::new(clock.clone()))
            .build()
            .unwrap();
        (registry, clock)
    }

    #[test]
    fn test_default_categories() {
        let registry = LimiterRegistry::new();
        let categories: Vec<&str> = registry.categories().collect();

        assert_eq!(categories, vec![API, GENERAL, NETWORK, VALIDATION]);
        assert_eq!(registry.fallback_category(), GENERAL);
        assert_eq!(
            registry.limiter(NETWORK).unwrap().config(),
            &LimiterConfig::network()
        );
    }

    #[test]
    fn test_categories_have_independent_state() {
        let (registry, _clock) = registry_with_clock();

        for _ in 0..3 {
            assert!(registry.log_error("socket closed", None, NETWORK));
        }
        assert!(!registry.log_error("socket closed", None, NETWORK));

        assert!(registry.log_error("socket closed", None, GENERAL));
        assert_eq!(registry.status("socket closed", None, Some(GENERAL)).count, 1);
        assert_eq!(registry.status("socket closed", None, Some(NETWORK)).count, 3);
    }

    #[test]
    fn test_unknown_category_falls_back() {
        let (registry, _clock) = registry_with_clock();

        for _ in 0..5 {
            assert!(registry.should_log("boom", None, Some("no-such-category")));
        }
        assert!(!registry.should_log("boom", None, None));
        assert!(!registry.should_log("boom", None, Some(GENERAL)));
        assert_eq!(registry.limiter(GENERAL).unwrap().signature_count(), 1);
    }

    #[test]
    fn test_all_stats_keyed_by_category() {
        let (registry, _clock) = registry_with_clock();

        registry.log_error("a", None, API);
        registry.log_error("b", None, API);
        registry.log_error("c", None, VALIDATION);

        let stats = registry.all_stats();
        assert_eq!(stats.len(), 4);
        assert_eq!(stats[API].total_unique_signatures, 2);
        assert_eq!(stats[VALIDATION].total_occurrences, 1);
        assert_eq!(stats[GENERAL], LimiterStats::default());
    }

    #[test]
    fn test_reset_one_or_all() {
        let (registry, _clock) = registry_with_clock();

        registry.log_error("a", None, API);
        registry.log_error("a", None, NETWORK);

        registry.reset(Some(API));
        assert_eq!(registry.limiter(API).unwrap().signature_count(), 0);
        assert_eq!(registry.limiter(NETWORK).unwrap().signature_count(), 1);

        registry.reset(Some("unknown"));
        assert_eq!(registry.limiter(NETWORK).unwrap().signature_count(), 1);

        registry.reset(None);
        assert_eq!(registry.limiter(NETWORK).unwrap().signature_count(), 0);
    }

    #[test]
    fn test_sweep_uses_each_category_retention() {
        let (registry, clock) = registry_with_clock();

        registry.log_error("a", None, NETWORK);
        registry.log_error("a", None, GENERAL);

        // network retention is 150s, general is 360s
        clock.advance(Duration::from_secs(151));
        assert_eq!(registry.sweep(), 1);
        assert_eq!(registry.limiter(NETWORK).unwrap().signature_count(), 0);
        assert_eq!(registry.limiter(GENERAL).unwrap().signature_count(), 1);

        clock.advance(Duration::from_secs(210));
        assert_eq!(registry.sweep(), 1);
        assert_eq!(registry.metrics_snapshot().signatures_swept, 2);
    }

    #[test]
    fn test_metrics_snapshot_sums_limiters() {
        let (registry, _clock) = registry_with_clock();

        for _ in 0..4 {
            registry.log_error("x", None, NETWORK);
        }
        registry.log_error("x", None, API);

        // Each limiter counts only its own occurrences
        let network = registry.limiter(NETWORK).unwrap().metrics().snapshot();
        assert_eq!(network.occurrences_admitted, 3);
        assert_eq!(network.occurrences_suppressed, 1);
        let api = registry.limiter(API).unwrap().metrics().snapshot();
        assert_eq!(api.occurrences_admitted, 1);
        assert_eq!(api.occurrences_suppressed, 0);

        let snapshot = registry.metrics_snapshot();
        assert_eq!(snapshot.occurrences_admitted, 4);
        assert_eq!(snapshot.occurrences_suppressed, 1);
    }

    #[test]
    fn test_clones_share_state() {
        let (registry, _clock) = registry_with_clock();
        let clone = registry.clone();

        registry.log_error("a", None, API);
        assert_eq!(clone.limiter(API).unwrap().signature_count(), 1);
    }

    #[test]
    fn test_custom_categories() {
        let registry = LimiterRegistry::builder()
            .with_category("payments", LimiterConfig::from_millis(1, 1_000, 1_000).unwrap())
            .with_category("ui", LimiterConfig::general())
            .with_fallback_category("ui")
            .build()
            .unwrap();

        assert_eq!(registry.fallback_category(), "ui");
        assert!(registry.log_error("declined", None, "payments"));
        assert!(!registry.log_error("declined", None, "payments"));
        assert!(registry.limiter(GENERAL).is_none());
    }

    #[test]
    fn test_later_category_replaces_earlier() {
        let registry = LimiterRegistry::builder()
            .with_default_categories()
            .with_category(API, LimiterConfig::from_millis(1, 1_000, 1_000).unwrap())
            .build()
            .unwrap();

        assert_eq!(registry.limiter(API).unwrap().config().max_occurrences(), 1);
        assert_eq!(registry.categories().count(), 4);
    }

    #[test]
    fn test_build_errors() {
        assert_eq!(
            LimiterRegistry::builder().build().unwrap_err(),
            BuildError::NoCategories
        );
        assert_eq!(
            LimiterRegistry::builder()
                .with_category("", LimiterConfig::general())
                .build()
                .unwrap_err(),
            BuildError::EmptyCategoryName
        );
        assert_eq!(
            LimiterRegistry::builder()
                .with_category("ui", LimiterConfig::general())
                .build()
                .unwrap_err(),
            BuildError::UnknownFallbackCategory(GENERAL.to_string())
        );
    }

    #[test]
    fn test_build_error_display() {
        assert_eq!(
            BuildError::UnknownFallbackCategory("ui".to_string()).to_string(),
            "fallback category 'ui' is not configured"
        );
    }
}

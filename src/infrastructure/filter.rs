//! Tracing integration filter.
//!
//! Provides a per-layer `Filter` that asks a [`LimiterRegistry`] before an
//! error event reaches the layer it guards, typically the layer that ships
//! errors to a telemetry backend. Suppressed events are dropped for that
//! layer only; other layers still see them.

use crate::application::registry::LimiterRegistry;
use crate::infrastructure::visitor::OccurrenceVisitor;
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Filter};

/// Target prefix of this crate's own diagnostics.
const OWN_TARGET: &str = "error_throttle";

/// Gates error events through a limiter registry.
///
/// Events at `min_level` or more severe (default: `ERROR` only) are turned
/// into occurrences and routed by their `category` field. Less severe events
/// pass untouched.
///
/// # Example
/// ```rust,no_run
/// use error_throttle::{ErrorGateFilter, LimiterRegistry};
/// use tracing_subscriber::prelude::*;
///
/// let limiters = LimiterRegistry::new();
///
/// tracing_subscriber::registry()
///     .with(tracing_subscriber::fmt::layer().with_filter(ErrorGateFilter::new(limiters.clone())))
///     .init();
///
/// tracing::error!(component = "checkout", category = "api", "payment provider returned 502");
/// ```
#[derive(Debug, Clone)]
pub struct ErrorGateFilter {
    registry: LimiterRegistry,
    min_level: Level,
}

impl ErrorGateFilter {
    /// Gate `ERROR` events through `registry`.
    pub fn new(registry: LimiterRegistry) -> Self {
        Self {
            registry,
            min_level: Level::ERROR,
        }
    }

    /// Also gate events down to `level` (e.g. `WARN`).
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Least severe level that is gated.
    pub fn min_level(&self) -> Level {
        self.min_level
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &LimiterRegistry {
        &self.registry
    }

    fn gates(&self, metadata: &Metadata<'_>) -> bool {
        let target = metadata.target();
        let own = target == OWN_TARGET
            || target
                .strip_prefix(OWN_TARGET)
                .is_some_and(|rest| rest.starts_with("::"));
        *metadata.level() <= self.min_level && !own
    }
}

impl<S> Filter<S> for ErrorGateFilter
where
    S: Subscriber,
{
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        // Decided per event in event_enabled
        true
    }

    fn event_enabled(&self, event: &Event<'_>, _cx: &Context<'_, S>) -> bool {
        let metadata = event.metadata();
        if !self.gates(metadata) {
            return true;
        }

        let mut visitor = OccurrenceVisitor::new();
        event.record(&mut visitor);
        let occurrence = visitor.into_occurrence(metadata.name());

        self.registry.should_log(
            &occurrence.error,
            Some(&occurrence.context),
            occurrence.category.as_deref(),
        )
    }
}

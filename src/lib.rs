//! # error-throttle
//!
//! Rate-limited admission gate for error telemetry.
//!
//! When a fault fires thousands of times a minute, shipping every occurrence
//! floods the monitoring pipeline without adding information. This crate
//! groups occurrences into **signatures** and answers one question per
//! occurrence: forward it, or drop it. The first occurrences of every group
//! always get through, and a group recovers on its own once the fault has
//! been quiet for a while.
//!
//! ## Quick Start
//!
//! ```rust
//! use error_throttle::{ErrorContext, LimiterRegistry};
//!
//! // general, api, network and validation categories with default limits
//! let limiters = LimiterRegistry::new();
//! let ctx = ErrorContext::new().with_component("checkout").with_action("pay");
//!
//! if limiters.log_error("payment provider returned 502", Some(&ctx), "api") {
//!     // send to the telemetry backend
//! }
//! ```
//!
//! With `tracing`, put an [`ErrorGateFilter`] in front of the layer that
//! ships errors:
//!
//! ```rust,no_run
//! use error_throttle::{ErrorGateFilter, LimiterRegistry};
//! use tracing_subscriber::prelude::*;
//!
//! let limiters = LimiterRegistry::new();
//!
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer().with_filter(ErrorGateFilter::new(limiters.clone())))
//!     .init();
//! ```
//!
//! ## Signatures
//!
//! A signature is derived from:
//! - the error name (`"Error"` for plain messages)
//! - the error message
//! - the first three lines of the stack text, if any
//! - the `component`, `action` and `url` context fields
//!
//! Any other context field is ignored, so user ids or request ids never
//! split a group. The hash is a fast 32-bit polynomial hash, not a
//! cryptographic one. Two unrelated errors can share a signature; they are
//! then limited together, which only makes suppression slightly stricter.
//!
//! ## Admission
//!
//! Each limiter is configured with `max_occurrences`, a counting `window` and
//! a `cooldown`. For every signature:
//!
//! - the first `max_occurrences` occurrences in a window are forwarded
//! - once the ceiling is reached, occurrences are dropped until the
//!   signature has been quiet for `cooldown`; every dropped occurrence
//!   restarts that quiet period
//! - the first occurrence after the cooldown opens a new window
//!
//! | Category | Max | Window | Cooldown |
//! |----------|-----|--------|----------|
//! | `general` | 5 | 60s | 300s |
//! | `api` | 10 | 60s | 180s |
//! | `network` | 3 | 30s | 120s |
//! | `validation` | 15 | 60s | 60s |
//!
//! Unknown categories use the fallback category (`general` by default).
//!
//! ## Memory
//!
//! Counters idle for longer than `window + cooldown` are removed by a sweep.
//! Call [`LimiterRegistry::sweep`] yourself, or start a background sweeper
//! (requires the `async` feature, on by default):
//!
//! ```rust,no_run
//! # use error_throttle::{LimiterRegistry, SweeperConfig};
//! # async fn run() {
//! let limiters = LimiterRegistry::new();
//! let sweeper = limiters.spawn_sweeper(SweeperConfig::default());
//!
//! // ... application runs ...
//!
//! sweeper.shutdown().await.expect("sweeper stopped cleanly");
//! # }
//! ```
//!
//! ## Features
//!
//! - `async` (default): background sweeper on tokio
//! - `serde`: `Serialize`/`Deserialize` for status, stats and metrics snapshots
//! - `test-helpers`: `MockClock` and `MockCaptureLayer`

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    counter::WindowCounter,
    policy::{Admission, AdmissionPolicy, LimiterConfig, PolicyDecision, PolicyError},
    signature::{ErrorContext, ErrorLike, ErrorSignature, SignatureHasher},
    status::{LimiterStats, RateLimitStatus},
};

pub use application::{
    limiter::{DefaultStorage, RateLimiter},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, Storage},
    registry::{BuildError, LimiterRegistry, LimiterRegistryBuilder},
    store::SignatureStore,
    sweeper::{Sweeper, SweeperConfig, SweeperConfigError},
};

#[cfg(feature = "async")]
pub use application::sweeper::{ShutdownError, SweeperHandle};

pub use infrastructure::{clock::SystemClock, filter::ErrorGateFilter, storage::ShardedStorage};

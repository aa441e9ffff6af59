use error_throttle::application::registry::{API, GENERAL, NETWORK, VALIDATION};
use error_throttle::infrastructure::mocks::MockClock;
use error_throttle::{
    Clock, ErrorContext, ErrorLike, ErrorSignature, LimiterConfig, LimiterRegistry,
    RateLimitStatus, RateLimiter,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn limiter(max: u32, window_ms: u64, cooldown_ms: u64) -> (RateLimiter, MockClock) {
    let clock = MockClock::new(Instant::now());
    let config = LimiterConfig::from_millis(max, window_ms, cooldown_ms).unwrap();
    (RateLimiter::with_clock(config, Arc::new(clock.clone())), clock)
}

fn registry() -> (LimiterRegistry, MockClock) {
    let clock = MockClock::new(Instant::now());
    let registry = LimiterRegistry::builder()
        .with_default_categories()
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    (registry, clock)
}

#[test]
fn test_first_occurrence_always_admitted() {
    let (limiter, _clock) = limiter(1, 60_000, 300_000);

    for i in 0..50 {
        assert!(limiter.should_log(format!("distinct failure {}", i), None));
    }
}

#[test]
fn test_ceiling_within_window() {
    let (limiter, clock) = limiter(4, 10_000, 60_000);

    for _ in 0..4 {
        assert!(limiter.should_log("boom", None));
        clock.advance_millis(2_000);
    }
    // 8s into the window
    assert!(!limiter.should_log("boom", None));
}

#[test]
fn test_reference_timeline() {
    // 5 per 60s, 300s cooldown; calls at t = 0,1,2,3,4,5,100,300100 ms
    let (limiter, clock) = limiter(5, 60_000, 300_000);
    let start = clock.now();
    let mut decisions = Vec::new();

    for t in [0, 1, 2, 3, 4, 5, 100, 300_100] {
        clock.set(start + Duration::from_millis(t));
        decisions.push(limiter.should_log("boom", None));
    }

    assert_eq!(
        decisions,
        vec![true, true, true, true, true, false, false, true]
    );
    assert_eq!(limiter.status("boom", None).count, 1);
}

#[test]
fn test_cooldown_persistence_and_release() {
    let (limiter, clock) = limiter(3, 30_000, 120_000);

    for _ in 0..3 {
        assert!(limiter.should_log("socket closed", None));
    }

    // Keep failing every 100s: long past the 30s window, never 120s quiet
    for _ in 0..5 {
        clock.advance(Duration::from_secs(100));
        assert!(!limiter.should_log("socket closed", None));
        assert!(limiter.status("socket closed", None).is_rate_limited);
    }

    clock.advance(Duration::from_secs(121));
    assert!(!limiter.status("socket closed", None).is_rate_limited);
    assert!(limiter.should_log("socket closed", None));
    assert_eq!(limiter.status("socket closed", None).count, 1);
}

#[test]
fn test_window_reset_without_ceiling() {
    let (limiter, clock) = limiter(5, 60_000, 300_000);

    for _ in 0..3 {
        assert!(limiter.should_log("boom", None));
    }
    clock.advance(Duration::from_secs(61));

    assert!(limiter.should_log("boom", None));
    let status = limiter.status("boom", None);
    assert_eq!(status.count, 1);
    assert_eq!(status.time_until_reset, Duration::from_secs(60));
}

#[test]
fn test_grouping_determinism() {
    let stack = "at charge (pay.rs:10)\nat submit (form.rs:4)\nat click (ui.rs:1)\nat main (main.rs:2)";
    let ctx = ErrorContext::new()
        .with_component("checkout")
        .with_action("pay")
        .with_url("/cart");
    let error = ErrorLike::new("PaymentError", "card declined").with_stack(stack);

    let a = ErrorSignature::derive(&error, Some(&ctx));
    let b = ErrorSignature::derive(&error.clone(), Some(&ctx.clone()));
    assert_eq!(a, b);
    assert_eq!(a.to_string(), b.to_string());

    // Stack lines past the third do not matter
    let other_tail = ErrorLike::new("PaymentError", "card declined")
        .with_stack("at charge (pay.rs:10)\nat submit (form.rs:4)\nat click (ui.rs:1)\nat other (x.rs:9)");
    assert_eq!(ErrorSignature::derive(&other_tail, Some(&ctx)), a);

    // Free-form fields do not matter
    let noisy = ctx.clone().with_field("user_id", "42").with_field("session", "abc");
    assert_eq!(ErrorSignature::derive(&error, Some(&noisy)), a);

    // Allow-listed fields do
    let moved = ctx.clone().with_component("cart");
    assert_ne!(ErrorSignature::derive(&error, Some(&moved)), a);
}

#[test]
fn test_shared_state_follows_signature() {
    let (limiter, _clock) = limiter(2, 60_000, 60_000);
    let ctx = ErrorContext::new().with_component("search");

    assert!(limiter.should_log(ErrorLike::new("Error", "index missing"), Some(&ctx)));
    // Plain message, same default name: same group
    assert!(limiter.should_log("index missing", Some(&ctx)));
    assert!(!limiter.should_log(String::from("index missing"), Some(&ctx)));
}

#[test]
fn test_from_std_error() {
    #[derive(Debug)]
    struct Inner;
    impl std::fmt::Display for Inner {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "connection refused")
        }
    }
    impl std::error::Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);
    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "sync failed")
        }
    }
    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    let (limiter, _clock) = limiter(1, 60_000, 60_000);
    let err = Outer(Inner);
    let occurrence = ErrorLike::from_error(&err);

    assert_eq!(occurrence.message(), "sync failed");
    assert_eq!(occurrence.stack(), Some("caused by: connection refused"));
    assert!(limiter.should_log(&occurrence, None));
    assert!(!limiter.should_log(ErrorLike::from_error(&err), None));
}

#[test]
fn test_memory_bound_after_sweep() {
    let (limiter, clock) = limiter(5, 60_000, 300_000);

    for i in 0..100 {
        limiter.should_log(format!("failure {}", i), None);
        clock.advance(Duration::from_secs(5));
    }
    // Last occurrence at 495s; the oldest are far beyond 360s idle
    let removed = limiter.sweep();
    assert!(removed > 0);

    let retention = limiter.config().retention();
    assert_eq!(limiter.signature_count(), 100 - removed);
    for i in 0..100 {
        let status = limiter.status(format!("failure {}", i), None);
        let seen_at = Duration::from_secs(5 * i as u64);
        let idle = Duration::from_secs(500) - seen_at;
        if idle > retention {
            assert_eq!(status, RateLimitStatus::default());
        } else {
            assert_eq!(status.count, 1);
        }
    }
}

#[test]
fn test_category_routing_scenario() {
    let (registry, clock) = registry();
    let ctx = ErrorContext::new().with_component("sync");

    for _ in 0..3 {
        assert!(registry.log_error("socket closed", Some(&ctx), NETWORK));
        clock.advance(Duration::from_secs(1));
    }
    assert!(!registry.log_error("socket closed", Some(&ctx), NETWORK));

    // The general limiter has never seen this error
    assert!(registry.log_error("socket closed", Some(&ctx), GENERAL));
    assert_eq!(
        registry.status("socket closed", Some(&ctx), Some(GENERAL)).count,
        1
    );
}

#[test]
fn test_default_category_limits() {
    let (registry, _clock) = registry();

    for (category, max) in [(GENERAL, 5), (API, 10), (NETWORK, 3), (VALIDATION, 15)] {
        for _ in 0..max {
            assert!(registry.log_error("same error", None, category));
        }
        assert!(!registry.log_error("same error", None, category));
    }
}

#[test]
fn test_all_stats_and_reset() {
    let (registry, clock) = registry();

    for _ in 0..12 {
        registry.log_error("rate limited upstream", None, API);
    }
    registry.log_error("bad email", None, VALIDATION);
    clock.advance(Duration::from_secs(30));

    let stats = registry.all_stats();
    assert_eq!(stats[API].total_unique_signatures, 1);
    assert_eq!(stats[API].rate_limited_signatures, 1);
    assert_eq!(stats[API].active_signatures, 1);
    assert_eq!(stats[API].total_occurrences, 10);
    assert_eq!(stats[VALIDATION].total_occurrences, 1);
    assert_eq!(stats[NETWORK].total_unique_signatures, 0);

    registry.reset(Some(API));
    assert!(registry.log_error("rate limited upstream", None, API));
    assert_eq!(registry.all_stats()[VALIDATION].total_unique_signatures, 1);

    registry.reset(None);
    assert!(registry
        .all_stats()
        .values()
        .all(|s| s.total_unique_signatures == 0));
}

#[test]
fn test_high_concurrency_stress() {
    use std::thread;

    let (registry, _clock) = registry();
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let registry = registry.clone();
            thread::spawn(move || {
                let mut admitted = 0;
                for i in 0..500 {
                    // 10 shared signatures hammered by every thread
                    if registry.log_error(format!("shared {}", i % 10), None, GENERAL) {
                        admitted += 1;
                    }
                    // plus thread-private ones
                    registry.log_error(format!("thread {} item {}", t, i), None, API);
                }
                admitted
            })
        })
        .collect();

    let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    // 10 signatures, 5 each, no matter how the threads interleave
    assert_eq!(admitted, 50);
    assert_eq!(registry.all_stats()[API].total_unique_signatures, 4_000);
    let snapshot = registry.metrics_snapshot();
    assert_eq!(snapshot.total_occurrences(), 8_000);
    assert_eq!(snapshot.occurrences_admitted, 50 + 4_000);
}

//! Integration tests for the background sweeper lifecycle.

#![cfg(feature = "async")]

use error_throttle::application::registry::{GENERAL, NETWORK};
use error_throttle::infrastructure::mocks::MockClock;
use error_throttle::{LimiterRegistry, SweeperConfig, SweeperHandle};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn registry(clock: &MockClock) -> LimiterRegistry {
    LimiterRegistry::builder()
        .with_default_categories()
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_sweeper_bounds_memory_while_running() {
    let clock = MockClock::new(Instant::now());
    let registry = registry(&clock);
    let handle = registry.spawn_sweeper(SweeperConfig::new(Duration::from_millis(20)).unwrap());

    for i in 0..50 {
        registry.log_error(format!("flaky dependency {}", i), None, NETWORK);
    }
    registry.log_error("still relevant", None, GENERAL);
    assert_eq!(registry.limiter(NETWORK).unwrap().signature_count(), 50);

    // Past network retention (150s), within general retention (360s)
    clock.advance(Duration::from_secs(200));
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(registry.limiter(NETWORK).unwrap().signature_count(), 0);
    assert_eq!(registry.limiter(GENERAL).unwrap().signature_count(), 1);
    assert_eq!(registry.metrics_snapshot().signatures_swept, 50);

    handle.shutdown().await.expect("shutdown failed");
}

#[tokio::test]
async fn test_admission_continues_after_shutdown() {
    let clock = MockClock::new(Instant::now());
    let registry = registry(&clock);
    let handle = registry.spawn_sweeper(SweeperConfig::new(Duration::from_millis(10)).unwrap());

    handle.shutdown().await.expect("shutdown failed");

    for _ in 0..3 {
        assert!(registry.log_error("socket closed", None, NETWORK));
    }
    assert!(!registry.log_error("socket closed", None, NETWORK));
}

#[tokio::test]
async fn test_handle_owned_by_application() {
    struct App {
        limiters: LimiterRegistry,
        sweeper: Option<SweeperHandle>,
    }

    impl App {
        fn start(clock: &MockClock) -> Self {
            let limiters = registry(clock);
            let sweeper = limiters
                .spawn_sweeper(SweeperConfig::new(Duration::from_millis(10)).unwrap());
            Self {
                limiters,
                sweeper: Some(sweeper),
            }
        }

        async fn shutdown(mut self) {
            if let Some(handle) = self.sweeper.take() {
                handle.shutdown().await.expect("shutdown failed");
            }
        }
    }

    let clock = MockClock::new(Instant::now());
    let app = App::start(&clock);
    app.limiters.log_error("boom", None, GENERAL);
    tokio::time::sleep(Duration::from_millis(30)).await;

    // Not stale yet: survives sweeps
    assert_eq!(app.limiters.limiter(GENERAL).unwrap().signature_count(), 1);

    app.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_shutdown_safety() {
    let clock = MockClock::new(Instant::now());
    let handles: Vec<_> = (0..5)
        .map(|_| {
            registry(&clock).spawn_sweeper(SweeperConfig::new(Duration::from_millis(5)).unwrap())
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(30)).await;

    for handle in handles {
        assert!(!handle.is_finished());
        handle.shutdown().await.expect("shutdown failed");
    }
}

#[tokio::test]
async fn test_dropped_handle_stops_task() {
    let clock = MockClock::new(Instant::now());
    let registry = registry(&clock);

    {
        let _handle = registry.spawn_sweeper(SweeperConfig::new(Duration::from_millis(5)).unwrap());
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    // Let the task observe the shutdown signal
    tokio::time::sleep(Duration::from_millis(20)).await;

    registry.log_error("boom", None, NETWORK);
    clock.advance(Duration::from_secs(151));
    tokio::time::sleep(Duration::from_millis(30)).await;

    // Nothing swept it: the sweeper died with its handle
    assert_eq!(registry.limiter(NETWORK).unwrap().signature_count(), 1);
    assert_eq!(registry.sweep(), 1);
}

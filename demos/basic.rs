//! Basic example gating an error storm.
//!
//! An fmt layer stands in for the telemetry backend. Errors reach it through
//! an `ErrorGateFilter`, so a fault that fires 50 times is shipped only up
//! to its category ceiling.

use error_throttle::{ErrorContext, ErrorGateFilter, LimiterRegistry, SweeperConfig};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let limiters = LimiterRegistry::new();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(ErrorGateFilter::new(limiters.clone())))
        .init();

    let sweeper = limiters.spawn_sweeper(
        SweeperConfig::new(Duration::from_secs(30)).expect("non-zero sweep interval"),
    );

    println!("=== Error storm through the tracing filter ===\n");
    println!("50 identical network errors (network: 3 per 30s):");
    for attempt in 1..=50 {
        error!(category = "network", attempt, "connection to payments.internal refused");
    }

    println!("\n20 API errors on two routes (api: 10 per 60s each):");
    for i in 0..20 {
        let url = if i % 2 == 0 { "/orders" } else { "/invoices" };
        error!(category = "api", url, status = 502, "upstream returned bad gateway");
    }

    println!("\nWarnings and info pass untouched:");
    warn!("cache miss ratio above 40%");
    info!("request served");

    println!("\n=== Direct calls ===\n");
    let ctx = ErrorContext::new()
        .with_component("checkout")
        .with_action("submit")
        .with_field("user_id", "42");
    let mut forwarded = 0;
    for _ in 0..12 {
        if limiters.log_error("card declined", Some(&ctx), "validation") {
            forwarded += 1;
        }
    }
    println!("validation: forwarded {} of 12", forwarded);

    let status = limiters.status("card declined", Some(&ctx), Some("validation"));
    println!(
        "status: count={} rate_limited={} reset_in={:?}",
        status.count, status.is_rate_limited, status.time_until_reset
    );

    println!("\n=== Stats ===\n");
    for (category, stats) in limiters.all_stats() {
        println!(
            "{:<11} signatures={:<3} rate_limited={:<3} occurrences={}",
            category,
            stats.total_unique_signatures,
            stats.rate_limited_signatures,
            stats.total_occurrences
        );
    }

    let snapshot = limiters.metrics_snapshot();
    println!(
        "\nadmitted={} suppressed={} suppression_rate={:.1}%",
        snapshot.occurrences_admitted,
        snapshot.occurrences_suppressed,
        snapshot.suppression_rate() * 100.0
    );

    if let Err(e) = sweeper.shutdown().await {
        eprintln!("sweeper did not stop cleanly: {}", e);
    }
}

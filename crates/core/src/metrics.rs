//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Session bootstraps
//! - Poll cycles and their outcomes
//! - Claim attempts and challenge round trips
//! - Watch-list size

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Session Metrics
// =============================================================================

/// Bootstrap attempts by result.
pub static BOOTSTRAPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("elective_bootstraps_total", "Total session bootstrap attempts"),
        &["result"], // "success", "network_error", "auth_error"
    )
    .unwrap()
});

/// Sessions discarded because the portal stopped recognizing them.
pub static SESSIONS_EXPIRED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "elective_sessions_expired_total",
        "Total sessions invalidated after expiry was detected",
    )
    .unwrap()
});

// =============================================================================
// Polling Metrics
// =============================================================================

/// Poll cycles by outcome.
pub static POLL_CYCLES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("elective_poll_cycles_total", "Total poll cycles"),
        &["outcome"], // "completed", "skipped", "session_expired"
    )
    .unwrap()
});

/// Catalog fetch duration in seconds.
pub static CATALOG_FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "elective_catalog_fetch_duration_seconds",
            "Duration of catalog fetches",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["result"], // "success", "error"
    )
    .unwrap()
});

/// Targets still on the watch-list.
pub static WATCHED_TARGETS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("elective_watched_targets", "Targets remaining on the watch-list").unwrap()
});

/// Targets dropped because no matching record was found.
pub static TARGETS_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "elective_targets_dropped_total",
        "Total targets removed without a successful claim",
    )
    .unwrap()
});

// =============================================================================
// Claim Metrics
// =============================================================================

/// Claim attempts by outcome.
pub static CLAIMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("elective_claims_total", "Total claim attempts"),
        &["outcome"], // "success", "rejected", "session_expired", "error"
    )
    .unwrap()
});

/// Challenge validation round trips by result.
pub static CHALLENGE_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "elective_challenge_attempts_total",
            "Total challenge answers submitted",
        ),
        &["result"], // "accepted", "refused"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Session
        Box::new(BOOTSTRAPS.clone()),
        Box::new(SESSIONS_EXPIRED.clone()),
        // Polling
        Box::new(POLL_CYCLES.clone()),
        Box::new(CATALOG_FETCH_DURATION.clone()),
        Box::new(WATCHED_TARGETS.clone()),
        Box::new(TARGETS_DROPPED.clone()),
        // Claims
        Box::new(CLAIMS.clone()),
        Box::new(CHALLENGE_ATTEMPTS.clone()),
    ]
}

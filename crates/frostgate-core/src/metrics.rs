//! Central metrics registry and metric definitions.
//!
//! Metrics are registered lazily on first access using once_cell::Lazy.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, register_int_gauge_vec, Histogram, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, IntGaugeVec,
};

use crate::state::CollectionState;

// ===== Lifecycle Metrics =====

/// Total number of completed collection reloads.
pub static RELOAD_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "frostgate_reload_total",
        "Total number of collection reloads"
    )
    .expect("Failed to register reload counter")
});

/// Total number of completed collection offloads.
pub static OFFLOAD_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "frostgate_offload_total",
        "Total number of collection offloads"
    )
    .expect("Failed to register offload counter")
});

/// Total number of write requests rejected during draining.
pub static WRITE_BLOCKED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "frostgate_write_blocked_total",
        "Total number of write requests blocked during draining"
    )
    .expect("Failed to register blocked-write counter")
});

/// Number of collections per lifecycle state.
pub static COLLECTIONS_BY_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "frostgate_collections",
        "Number of collections per lifecycle state",
        &["state"]
    )
    .expect("Failed to register collections gauge")
});

/// Time taken to reload a collection from snapshot.
pub static RELOAD_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "frostgate_reload_duration_seconds",
        "Time taken to reload a collection",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register reload duration histogram")
});

/// Time a blocking-mode request waits for a reload to finish.
pub static BLOCKING_RELOAD_WAIT: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "frostgate_blocking_reload_wait_seconds",
        "Time a request waits for a blocking reload to finish",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register blocking wait histogram")
});

// ===== HTTP Metrics =====

/// Total number of HTTP requests by method, endpoint, and status code.
pub static HTTP_REQUEST_COUNT: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "frostgate_http_requests_total",
        "Total number of HTTP requests",
        &["method", "endpoint", "status"]
    )
    .expect("Failed to register HTTP request counter")
});

/// HTTP request duration histogram.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "frostgate_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "endpoint"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP request duration histogram")
});

/// Number of in-flight requests against the proxy.
pub static ACTIVE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "frostgate_active_connections",
        "Number of in-flight requests against the proxy"
    )
    .expect("Failed to register active connections gauge")
});

/// Publishes per-state collection counts; absent states are reported as 0.
pub fn update_state_gauges(counts: &HashMap<CollectionState, i64>) {
    for state in CollectionState::ALL {
        COLLECTIONS_BY_STATE
            .with_label_values(&[state.as_str()])
            .set(counts.get(&state).copied().unwrap_or(0));
    }
}

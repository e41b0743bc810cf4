//! Metrics middleware for tracking HTTP requests
//!
//! This middleware automatically records Prometheus metrics for all HTTP
//! requests, including request count, duration, and active connections.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Request, Response},
    middleware::Next,
};
use std::time::Instant;

/// Middleware to track HTTP request metrics
///
/// This middleware:
/// - Increments active connections counter
/// - Records request duration histogram
/// - Counts requests by method, endpoint, and status code
/// - Decrements active connections when request completes
pub async fn track_metrics(req: Request<Body>, next: Next) -> Response<Body> {
    let start = Instant::now();
    let method = req.method().clone();

    // Proxied traffic has no matched route; collapse it under one label so
    // arbitrary collection names do not explode label cardinality.
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "proxy".to_string());

    frostgate_core::metrics::ACTIVE_CONNECTIONS.inc();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status().as_u16().to_string();

    frostgate_core::metrics::ACTIVE_CONNECTIONS.dec();

    frostgate_core::metrics::HTTP_REQUEST_COUNT
        .with_label_values(&[method.as_str(), &path, &status])
        .inc();

    frostgate_core::metrics::HTTP_REQUEST_DURATION
        .with_label_values(&[method.as_str(), &path])
        .observe(duration.as_secs_f64());

    response
}

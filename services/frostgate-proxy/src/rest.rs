use crate::{
    handlers::{admin_offload, admin_reload, health_check, metrics_handler},
    middleware::track_metrics,
    proxy,
    state::AppState,
};
use axum::{
    extract::Request,
    middleware,
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{classify::ServerErrorsFailureClass, trace::TraceLayer};
use tracing::{info_span, Span};
use uuid::Uuid;

/// Builds the Axum router for the hibernation proxy.
///
/// Admin and observability routes are matched first; everything else falls
/// through to the upstream forwarder, which applies the lifecycle
/// interception rules for collection-scoped traffic.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Lifecycle administration
        .route("/admin/reload/:collection", post(admin_reload))
        .route("/admin/offload/:collection", post(admin_offload))
        // Everything else is proxied to the search engine
        .fallback(proxy::forward)
        // Add state
        .with_state(state)
        // Add metrics middleware (tracks ALL requests, including proxied ones)
        .layer(middleware::from_fn(track_metrics))
        // Add logging layer
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let request_id = Uuid::new_v4();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_request(|_request: &Request, _span: &Span| {
                    tracing::debug!("started processing request");
                })
                .on_response(|response: &Response, latency: std::time::Duration, _span: &Span| {
                    let status = response.status();
                    let latency_ms = latency.as_millis();

                    if status.is_server_error() {
                        tracing::error!(status = %status, latency_ms = latency_ms, "request failed with server error");
                    } else if status.is_client_error() {
                        tracing::warn!(status = %status, latency_ms = latency_ms, "request failed with client error");
                    } else {
                        tracing::info!(status = %status, latency_ms = latency_ms, "request completed");
                    }
                })
                .on_failure(|failure_class: ServerErrorsFailureClass, latency: std::time::Duration, _span: &Span| {
                    tracing::error!(failure_class = ?failure_class, latency_ms = latency.as_millis(), "request failed");
                }),
        )
}

//! Explicit HTTP handlers: administrative lifecycle control, health, and
//! Prometheus metrics. Everything else falls through to the proxy.

mod admin;
mod metrics;

pub use admin::{admin_offload, admin_reload, ApiError};
pub use metrics::metrics_handler;

pub async fn health_check() -> &'static str {
    "ok"
}

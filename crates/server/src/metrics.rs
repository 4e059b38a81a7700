//! Prometheus metrics
//!
//! The recorder is installed once per process; `/metrics` renders it.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Latency buckets in seconds, sized for remote completions
const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0];

/// Install the Prometheus recorder
///
/// Returns `None` when it cannot be installed (e.g. another recorder is
/// already global); metrics calls then become no-ops.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if let Some(handle) = PROMETHEUS.get() {
        return Some(handle.clone());
    }

    let builder = match PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("_seconds".to_string()), LATENCY_BUCKETS)
    {
        Ok(builder) => builder,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid histogram buckets, metrics disabled");
            return None;
        }
    };

    match builder.install_recorder() {
        Ok(handle) => {
            let _ = PROMETHEUS.set(handle.clone());
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

/// GET /metrics
pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

pub fn record_request(endpoint: &str, status: u16) {
    metrics::counter!(
        "lead_agent_http_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_capture(qualified: bool) {
    metrics::counter!(
        "lead_agent_leads_captured_total",
        "qualified" => if qualified { "true" } else { "false" }
    )
    .increment(1);
}

pub fn record_error(kind: &'static str) {
    metrics::counter!("lead_agent_errors_total", "kind" => kind).increment(1);
}

pub fn record_active_sessions(count: usize) {
    metrics::gauge!("lead_agent_active_sessions").set(count as f64);
}

//! Prometheus metrics for the HTTP surface
//!
//! A process-wide registry with request counters and latencies, exposed
//! in text format under the debug mount.

use lazy_static::lazy_static;
use prometheus::{
    opts, register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder,
};
use std::sync::Once;
use tracing::debug;

/// Route label used for requests that matched no route
pub const UNMATCHED_ROUTE: &str = "unmatched";

lazy_static! {
    /// Registry exposed at `/debug/metrics`
    pub static ref REGISTRY: Registry = Registry::new();

    /// Total number of HTTP requests
    /// Labels: method, route, status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!("http_requests_total", "Total number of HTTP requests"),
        &["method", "route", "status"]
    )
    .expect("Failed to create http_requests_total metric");

    /// HTTP request duration in seconds
    /// Labels: method, route, status
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies",
        &["method", "route", "status"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create http_request_duration_seconds metric");

    /// Panics caught by the recovery middleware
    pub static ref HTTP_PANICS_RECOVERED_TOTAL: IntCounter = register_int_counter!(
        opts!("http_panics_recovered_total", "Total number of recovered handler panics")
    )
    .expect("Failed to create http_panics_recovered_total metric");

    /// Requests rejected by the rate limiter
    pub static ref HTTP_RATE_LIMITED_TOTAL: IntCounter = register_int_counter!(
        opts!("http_rate_limited_total", "Total number of rate limited requests")
    )
    .expect("Failed to create http_rate_limited_total metric");
}

static INIT: Once = Once::new();

/// Register all metrics with the exposed registry; safe to call repeatedly
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
            .expect("Failed to register http_requests_total");
        REGISTRY
            .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
            .expect("Failed to register http_request_duration_seconds");
        REGISTRY
            .register(Box::new(HTTP_PANICS_RECOVERED_TOTAL.clone()))
            .expect("Failed to register http_panics_recovered_total");
        REGISTRY
            .register(Box::new(HTTP_RATE_LIMITED_TOTAL.clone()))
            .expect("Failed to register http_rate_limited_total");

        debug!("Prometheus metrics registry initialized");
    });
}

/// Record an HTTP request
pub fn record_http_request(method: &str, route: &str, status: u16, duration_seconds: f64) {
    let status = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, route, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, route, status.as_str()])
        .observe(duration_seconds);
}

pub fn record_panic_recovered() {
    HTTP_PANICS_RECOVERED_TOTAL.inc();
}

pub fn record_rate_limited() {
    HTTP_RATE_LIMITED_TOTAL.inc();
}

/// Gather all metrics and encode them in Prometheus text format
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Failed to convert metrics to UTF-8: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 204, 0.002);
        record_http_request("GET", UNMATCHED_ROUTE, 404, 0.001);

        let count = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "204"])
            .get();
        assert!(count >= 1);
    }

    #[test]
    fn test_gather_metrics() {
        init_metrics();
        record_panic_recovered();
        record_rate_limited();
        record_http_request("GET", "/", 200, 0.01);

        let metrics_text = gather_metrics().unwrap();
        assert!(metrics_text.contains("http_requests_total"));
        assert!(metrics_text.contains("http_panics_recovered_total"));
        assert!(metrics_text.contains("# HELP"));
        assert!(metrics_text.contains("# TYPE"));
    }
}

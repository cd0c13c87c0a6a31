//! Runtime introspection under `/debug`
//!
//! - `/debug` redirects to `/debug/vars`
//! - `/debug/vars` reports build information and process details as JSON
//! - `/debug/metrics` exposes the Prometheus registry in text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::{
    build,
    http::{
        handlers::AppState,
        middleware::CorrelationId,
        responses::{json_response, ErrorResponse},
    },
    version,
};

const VARS_PATH: &str = "/debug/vars";
const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub build_tag: &'static str,
    pub version: &'static str,
    pub commit: &'static str,
    pub branch: &'static str,
    pub build_time: &'static str,
    pub rust_version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            build_tag: version::build_tag(),
            version: build::PKG_VERSION,
            commit: build::COMMIT_HASH,
            branch: build::BRANCH,
            build_time: build::BUILD_TIME,
            rust_version: build::RUST_VERSION,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VarsResponse {
    pub build: BuildInfo,
    pub uptime_seconds: u64,
    pub pid: u32,
    pub cmdline: Vec<String>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handle_index))
        .route("/vars", get(handle_vars))
        .route("/metrics", get(handle_metrics))
}

/// GET /debug
async fn handle_index() -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, VARS_PATH)]).into_response()
}

/// GET /debug/vars
async fn handle_vars(State(state): State<Arc<AppState>>) -> Response {
    json_response(
        StatusCode::OK,
        &VarsResponse {
            build: BuildInfo::current(),
            uptime_seconds: state.uptime().as_secs(),
            pid: std::process::id(),
            cmdline: std::env::args().collect(),
        },
    )
}

/// GET /debug/metrics
async fn handle_metrics(CorrelationId(request_id): CorrelationId) -> Response {
    match crate::metrics::gather_metrics() {
        Ok(metrics_text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)],
            metrics_text,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to gather Prometheus metrics");
            ErrorResponse::from_status(StatusCode::INTERNAL_SERVER_ERROR, request_id)
                .into_response()
        }
    }
}

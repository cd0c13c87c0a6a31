//! HTTP endpoint handlers
//!
//! The service answers only a small fixed set of routes. Everything else
//! ends in one of the two fallbacks, which produce the error envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::debug;

use crate::{
    config::SystemConfig,
    http::{
        debug,
        middleware::{CorrelationId, RateLimiter},
        responses::{json_response, ErrorResponse, RootResponse},
    },
    version,
};

/// Application state shared across handlers
pub struct AppState {
    pub config: SystemConfig,
    pub start_time: Instant,
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

impl AppState {
    pub fn new(config: SystemConfig, rate_limiter: Option<Arc<RateLimiter>>) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            rate_limiter,
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Routes and fallbacks, without middleware
pub fn routes(config: &SystemConfig) -> Router<Arc<AppState>> {
    let router = Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health));

    let router = if config.debug.enabled {
        router.nest("/debug", debug::router())
    } else {
        router
    };

    router
        .fallback(handle_not_found)
        .method_not_allowed_fallback(handle_method_not_allowed)
}

/// GET / - Build tag of the running binary
pub async fn handle_root() -> Response {
    json_response(
        StatusCode::OK,
        &RootResponse {
            build_tag: version::build_tag().to_string(),
        },
    )
}

/// GET /health - Liveness check
pub async fn handle_health() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Fallback for unknown routes
pub async fn handle_not_found(CorrelationId(request_id): CorrelationId) -> impl IntoResponse {
    debug!(request_id = %request_id, "No route matched");
    ErrorResponse::new(StatusCode::NOT_FOUND, "Endpoint Not Found", request_id)
}

/// Fallback for known routes requested with an unsupported method
pub async fn handle_method_not_allowed(
    CorrelationId(request_id): CorrelationId,
) -> impl IntoResponse {
    ErrorResponse::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "Method Not Allowed",
        request_id,
    )
}

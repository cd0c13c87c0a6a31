//! HTTP middleware stack
//!
//! Layers wrapped around every route, including the 404 and 405 fallbacks.
//! Listed from the outside in:
//! - Request id assignment and propagation
//! - Tracing span per request
//! - Request metrics
//! - Panic recovery
//! - Content-type allow-list
//! - Cache suppression
//! - Client IP resolution
//! - Request timeout
//! - CORS
//! - Forced error responses (`must_err`)
//! - Rate limiting, when enabled
//!
//! Path cleaning lives in [`path`] and runs in front of the router, since
//! layers added with `Router::layer` only see requests after routing.

pub mod content_type;
pub mod cors;
pub mod must_err;
pub mod no_cache;
pub mod path;
pub mod rate_limit;
pub mod real_ip;
pub mod recover;
pub mod request_id;
pub mod request_metrics;
pub mod timeout;

use axum::{
    extract::Request,
    middleware::{from_fn, from_fn_with_state},
    response::Response,
    Router,
};
use std::{sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;

use crate::{config::SystemConfig, logging};

pub use content_type::{content_type_middleware, AllowedContentTypes};
pub use cors::cors_layer;
pub use must_err::must_err_middleware;
pub use no_cache::no_cache_middleware;
pub use path::{clean_path, normalize_request_path};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use real_ip::{real_ip_middleware, ClientIp};
pub use recover::recover_middleware;
pub use request_id::{CorrelationId, REQUEST_ID_HEADER};
pub use request_metrics::request_metrics_middleware;
pub use timeout::timeout_middleware;

/// Wrap `router` in the middleware stack.
///
/// Routes and fallbacks must already be registered; `Router::layer` does not
/// apply to anything added afterwards.
pub fn apply<S>(
    router: Router<S>,
    config: &SystemConfig,
    rate_limiter: Option<Arc<RateLimiter>>,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // Innermost first
    let router = match rate_limiter {
        Some(limiter) => router.layer(from_fn_with_state(limiter, rate_limit_middleware)),
        None => router,
    };

    router
        .layer(from_fn(must_err_middleware))
        .layer(cors_layer(&config.cors))
        .layer(from_fn_with_state(
            config.server.request_timeout(),
            timeout_middleware,
        ))
        .layer(from_fn(real_ip_middleware))
        .layer(from_fn(no_cache_middleware))
        .layer(from_fn_with_state(
            AllowedContentTypes::new(&config.server.allowed_content_types),
            content_type_middleware,
        ))
        .layer(from_fn(recover_middleware))
        .layer(from_fn(request_metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request_id::request_id_of(request);
                logging::request_span(request.method(), request.uri(), &request_id)
            })
            .on_response(
                |response: &Response, latency: Duration, span: &tracing::Span| {
                    span.record("status", response.status().as_u16());
                    tracing::debug!(
                        latency_ms = latency.as_millis() as u64,
                        "finished processing request"
                    );
                },
            ),
        )
        .layer(request_id::propagate_request_id_layer())
        .layer(request_id::set_request_id_layer())
}

//! CORS policy built from configuration
//!
//! Policy evaluation is left to `tower_http::cors`; this module only maps the
//! configured allow-lists onto it. Origin entries may contain a single `*`
//! wildcard, e.g. `https://*` or `https://*.example.com`.

use axum::http::{request::Parts, HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders};

use crate::config::CorsConfig;

const WILDCARD: &str = "*";

/// Build the CORS layer. The configuration must have passed validation.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allow_origin(&config.allowed_origins))
        .allow_methods(allow_methods(&config.allowed_methods))
        .allow_headers(allow_headers(&config.allowed_headers))
        .expose_headers(expose_headers(&config.exposed_headers))
        .allow_credentials(config.allow_credentials)
        .max_age(Duration::from_secs(config.max_age))
}

/// Origin allow-list entry
#[derive(Debug, Clone, PartialEq, Eq)]
enum OriginPattern {
    Exact(String),
    Wildcard { prefix: String, suffix: String },
}

impl OriginPattern {
    fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim().to_lowercase();
        match pattern.split_once('*') {
            Some((prefix, suffix)) => OriginPattern::Wildcard {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            },
            None => OriginPattern::Exact(pattern),
        }
    }

    fn matches(&self, origin: &str) -> bool {
        match self {
            OriginPattern::Exact(exact) => exact == origin,
            OriginPattern::Wildcard { prefix, suffix } => {
                origin.len() >= prefix.len() + suffix.len()
                    && origin.starts_with(prefix.as_str())
                    && origin.ends_with(suffix.as_str())
            }
        }
    }
}

fn allow_origin(origins: &[String]) -> AllowOrigin {
    if origins.iter().any(|o| o == WILDCARD) {
        return AllowOrigin::any();
    }

    let patterns: Vec<OriginPattern> = origins.iter().map(|o| OriginPattern::parse(o)).collect();
    AllowOrigin::predicate(move |origin: &HeaderValue, _parts: &Parts| {
        origin
            .to_str()
            .map(|origin| {
                let origin = origin.to_lowercase();
                patterns.iter().any(|p| p.matches(&origin))
            })
            .unwrap_or(false)
    })
}

fn allow_methods(methods: &[String]) -> AllowMethods {
    if methods.iter().any(|m| m == WILDCARD) {
        return AllowMethods::any();
    }
    AllowMethods::list(
        methods
            .iter()
            .filter_map(|m| Method::from_bytes(m.to_uppercase().as_bytes()).ok()),
    )
}

fn header_names(headers: &[String]) -> Vec<HeaderName> {
    headers
        .iter()
        .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok())
        .collect()
}

fn allow_headers(headers: &[String]) -> AllowHeaders {
    if headers.iter().any(|h| h == WILDCARD) {
        return AllowHeaders::any();
    }
    AllowHeaders::list(header_names(headers))
}

fn expose_headers(headers: &[String]) -> ExposeHeaders {
    if headers.iter().any(|h| h == WILDCARD) {
        return ExposeHeaders::any();
    }
    ExposeHeaders::list(header_names(headers))
}

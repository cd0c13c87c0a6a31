//! Request content-type allow-list
//!
//! Requests carrying a body must declare one of the configured media types;
//! anything else is answered with 415. Bodiless requests always pass.

use axum::{
    body::HttpBody,
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::http::{middleware::request_id::request_id_of, responses::ErrorResponse};

/// Normalized set of accepted media types
#[derive(Debug, Clone)]
pub struct AllowedContentTypes(Arc<Vec<String>>);

impl AllowedContentTypes {
    pub fn new(types: &[String]) -> Self {
        Self(Arc::new(
            types.iter().map(|t| t.trim().to_lowercase()).collect(),
        ))
    }

    pub fn allows(&self, content_type: &str) -> bool {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        self.0.iter().any(|allowed| *allowed == media_type)
    }
}

pub async fn content_type_middleware(
    State(allowed): State<AllowedContentTypes>,
    request: Request,
    next: Next,
) -> Response {
    if !has_body(&request) {
        return next.run(request).await;
    }

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if allowed.allows(content_type) {
        return next.run(request).await;
    }

    debug!(content_type = %content_type, "Rejected request body content type");
    ErrorResponse::from_status(StatusCode::UNSUPPORTED_MEDIA_TYPE, request_id_of(&request))
        .into_response()
}

fn has_body(request: &Request) -> bool {
    if request.body().size_hint().exact() == Some(0) {
        return false;
    }
    declared_length(request.headers()) != Some(0)
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> AllowedContentTypes {
        AllowedContentTypes::new(&[
            "application/json".to_string(),
            "Application/X-WWW-Form-Urlencoded".to_string(),
        ])
    }

    #[test]
    fn test_allows_exact_media_type() {
        assert!(allowed().allows("application/json"));
        assert!(allowed().allows("application/x-www-form-urlencoded"));
    }

    #[test]
    fn test_allows_ignores_parameters_and_case() {
        assert!(allowed().allows("application/json; charset=utf-8"));
        assert!(allowed().allows("  APPLICATION/JSON "));
    }

    #[test]
    fn test_rejects_other_media_types() {
        assert!(!allowed().allows("text/plain"));
        assert!(!allowed().allows("multipart/form-data; boundary=x"));
        assert!(!allowed().allows(""));
    }

    #[test]
    fn test_declared_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers), None);
        headers.insert(header::CONTENT_LENGTH, "0".parse().unwrap());
        assert_eq!(declared_length(&headers), Some(0));
        headers.insert(header::CONTENT_LENGTH, "42".parse().unwrap());
        assert_eq!(declared_length(&headers), Some(42));
    }
}

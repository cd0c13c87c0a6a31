//! Request path cleaning
//!
//! Runs in front of the router so that `//health/`, `/./health` and
//! `/x/../health` all route to `/health`.

use axum::{extract::Request, http::Uri};
use tracing::trace;

/// Rewrite the request URI to its cleaned path, keeping the query
pub fn normalize_request_path(mut request: Request) -> Request {
    let path = request.uri().path();
    let cleaned = clean_path(path);
    if cleaned == path {
        return request;
    }

    let path_and_query = match request.uri().query() {
        Some(query) => format!("{}?{}", cleaned, query),
        None => cleaned,
    };

    let mut parts = request.uri().clone().into_parts();
    match path_and_query.parse() {
        Ok(pq) => {
            parts.path_and_query = Some(pq);
            if let Ok(uri) = Uri::from_parts(parts) {
                trace!(from = %request.uri(), to = %uri, "Normalized request path");
                *request.uri_mut() = uri;
            }
        }
        Err(e) => trace!(error = %e, "Leaving request path as is"),
    }
    request
}

/// Lexically clean a URL path: collapse repeated slashes, drop `.`
/// segments, resolve `..` against the previous segment and remove any
/// trailing slash. The result always starts with `/`.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut cleaned = String::with_capacity(path.len());
    for segment in &segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    if cleaned.is_empty() {
        cleaned.push('/');
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/"), "/");
        assert_eq!(clean_path(""), "/");
        assert_eq!(clean_path("/health"), "/health");
        assert_eq!(clean_path("/health/"), "/health");
        assert_eq!(clean_path("//health"), "/health");
        assert_eq!(clean_path("/a//b///c/"), "/a/b/c");
        assert_eq!(clean_path("/./health"), "/health");
        assert_eq!(clean_path("/x/../health"), "/health");
        assert_eq!(clean_path("/../../health"), "/health");
        assert_eq!(clean_path("/a/b/.."), "/a");
        assert_eq!(clean_path("/debug/vars/."), "/debug/vars");
    }

    #[test]
    fn test_normalize_keeps_query() {
        let request = Request::builder()
            .uri("//health/?must_err=418")
            .body(Body::empty())
            .unwrap();
        let request = normalize_request_path(request);

        assert_eq!(request.uri().path(), "/health");
        assert_eq!(request.uri().query(), Some("must_err=418"));
    }

    #[test]
    fn test_normalize_absolute_uri() {
        let request = Request::builder()
            .uri("http://localhost:8080/debug//vars/")
            .body(Body::empty())
            .unwrap();
        let request = normalize_request_path(request);

        assert_eq!(request.uri().path(), "/debug/vars");
        assert_eq!(request.uri().host(), Some("localhost"));
    }

    #[test]
    fn test_normalize_leaves_clean_path_untouched() {
        let request = Request::builder()
            .uri("/debug/vars?x=1")
            .body(Body::empty())
            .unwrap();
        let request = normalize_request_path(request);
        assert_eq!(request.uri(), "/debug/vars?x=1");
    }
}

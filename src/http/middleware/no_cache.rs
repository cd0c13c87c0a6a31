//! Cache suppression
//!
//! Strips conditional request headers so handlers never answer 304, and
//! marks every response as non-cacheable for clients and proxies.

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

const EPOCH: &str = "Thu, 01 Jan 1970 00:00:00 UTC";

const CACHE_CONTROL: &str = "no-cache, no-store, no-transform, must-revalidate, private, max-age=0";

const ETAG_HEADERS: [HeaderName; 6] = [
    header::ETAG,
    header::IF_MODIFIED_SINCE,
    header::IF_MATCH,
    header::IF_NONE_MATCH,
    header::IF_RANGE,
    header::IF_UNMODIFIED_SINCE,
];

pub async fn no_cache_middleware(mut request: Request, next: Next) -> Response {
    for name in &ETAG_HEADERS {
        request.headers_mut().remove(name);
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::EXPIRES, HeaderValue::from_static(EPOCH));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(
        HeaderName::from_static("x-accel-expires"),
        HeaderValue::from_static("0"),
    );
    response
}

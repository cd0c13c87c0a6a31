//! Request correlation ids
//!
//! An incoming `x-request-id` header is kept as is; otherwise a UUID v4 is
//! generated. The id is echoed on the response and is available to handlers
//! through the [`CorrelationId`] extractor.

use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, Extensions, HeaderMap},
};
use std::convert::Infallible;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Layer assigning an id to every request that does not carry one
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer copying the request id onto the response
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// The request id of the current request, empty when none was assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CorrelationId(lookup(&parts.extensions, &parts.headers)))
    }
}

/// Request id of a request seen by a middleware
pub fn request_id_of(request: &Request) -> String {
    lookup(request.extensions(), request.headers())
}

fn lookup(extensions: &Extensions, headers: &HeaderMap) -> String {
    extensions
        .get::<RequestId>()
        .map(|id| id.header_value())
        .or_else(|| headers.get(REQUEST_ID_HEADER))
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

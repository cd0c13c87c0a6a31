//! JSON response bodies for the HTTP surface
//!
//! Every failure leaves the service as the same error envelope:
//! `{"code": int, "error": string, "request_id": string}`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Content type of every JSON body the service writes
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Body of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub build_tag: String,
}

/// Standard error envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: String,
    pub request_id: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            error: error.into(),
            request_id: request_id.into(),
        }
    }

    /// Envelope whose message is the canonical reason phrase of `status`,
    /// or empty when the code has none
    pub fn from_status(status: StatusCode, request_id: impl Into<String>) -> Self {
        Self::new(
            status,
            status.canonical_reason().unwrap_or_default(),
            request_id,
        )
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        json_response(self.status(), &self)
    }
}

/// Serialize `body` with the service's JSON content type
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut response = (status, bytes).into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(JSON_CONTENT_TYPE),
            );
            response
        }
        Err(e) => {
            error!(error = %e, "Failed to serialize response body");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

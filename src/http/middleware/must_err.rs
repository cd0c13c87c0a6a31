//! Forced error responses for black-box testing
//!
//! A request carrying `must_err=<code>` with a three digit code in
//! `[400, 600)` is answered with that status and the error envelope before
//! reaching routing, e.g. `GET /login?must_err=403`.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::http::{middleware::request_id::request_id_of, responses::ErrorResponse};

pub const MUST_ERR_PARAM: &str = "must_err";

pub async fn must_err_middleware(request: Request, next: Next) -> Response {
    let Some(status) = request.uri().query().and_then(forced_status) else {
        return next.run(request).await;
    };

    debug!(
        status = status.as_u16(),
        uri = %request.uri(),
        "Forcing error response"
    );
    ErrorResponse::from_status(status, request_id_of(&request)).into_response()
}

/// Status requested through the query string, if it is a valid error code
pub fn forced_status(query: &str) -> Option<StatusCode> {
    let value = url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == MUST_ERR_PARAM)
        .map(|(_, value)| value)?;

    if value.len() != 3 {
        return None;
    }
    let code: u16 = value.parse().ok()?;
    if !(400..600).contains(&code) {
        return None;
    }
    StatusCode::from_u16(code).ok()
}

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tracing::warn;

use crate::http::{middleware::request_id::request_id_of, responses::ErrorResponse};

/// Abort requests that run past the deadline with 504
pub async fn timeout_middleware(
    State(deadline): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = request_id_of(&request);
    let method = request.method().clone();
    let uri = request.uri().clone();

    match tokio::time::timeout(deadline, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(
                method = %method,
                uri = %uri,
                request_id = %request_id,
                timeout_ms = deadline.as_millis() as u64,
                "Request timed out"
            );
            ErrorResponse::from_status(StatusCode::GATEWAY_TIMEOUT, request_id).into_response()
        }
    }
}

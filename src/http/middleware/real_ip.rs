//! Client IP resolution
//!
//! Resolves the originating client address from proxy headers, falling back
//! to the socket peer, and stores it as a [`ClientIp`] request extension.

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};

/// Resolved address of the client that originated the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

const TRUE_CLIENT_IP: &str = "true-client-ip";
const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

pub async fn real_ip_middleware(mut request: Request, next: Next) -> Response {
    if let Some(ip) = extract_client_ip(&request) {
        request.extensions_mut().insert(ClientIp(ip));
    }
    next.run(request).await
}

/// Extract client IP from request, considering proxy headers
pub fn extract_client_ip(request: &Request) -> Option<IpAddr> {
    if let Some(ip) = ip_from_headers(request.headers()) {
        return Some(ip);
    }

    // Fallback to connection info from socket
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(ip) = header_str(TRUE_CLIENT_IP).and_then(|v| v.trim().parse().ok()) {
        return Some(ip);
    }
    if let Some(ip) = header_str(X_REAL_IP).and_then(|v| v.trim().parse().ok()) {
        return Some(ip);
    }

    // X-Forwarded-For can contain multiple IPs, take the first (original client)
    header_str(X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
}

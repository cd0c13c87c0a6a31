//! HTTP surface of the service
//!
//! Endpoints:
//! - GET / - Build tag
//! - GET /health - Liveness check
//! - /debug/* - Runtime introspection, when enabled
//!
//! Every other request ends in a JSON error envelope.

pub mod debug;
pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod server;

pub use server::start_server;

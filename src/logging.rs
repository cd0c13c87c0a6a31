//! Logging module for the Gatehouse HTTP service
//!
//! This module provides structured logging functionality with support for:
//! - JSON and pretty format output
//! - Configurable log levels via environment or configuration
//! - Per-request spans carrying the request id
//! - CLI argument integration for logging preferences

use axum::http::{Method, Uri};
use tracing::{info_span, Span};
use tracing_subscriber::{fmt::time::ChronoLocal, EnvFilter};

use crate::config::SystemConfig;
use crate::types::Result;

/// Create a per-request span
pub fn request_span(method: &Method, uri: &Uri, request_id: &str) -> Span {
    info_span!(
        "http_request",
        method = %method,
        uri = %uri,
        request_id = request_id,
        status = tracing::field::Empty,
    )
}

/// Log level enum values as strings for configuration
pub mod level {
    pub const TRACE: &str = "trace";
    pub const DEBUG: &str = "debug";
    pub const INFO: &str = "info";
    pub const WARN: &str = "warn";
    pub const ERROR: &str = "error";
}

/// Log format enum values as strings for configuration
pub mod format {
    pub const JSON: &str = "json";
    pub const PRETTY: &str = "pretty";
}

/// Initialize logging with configuration
///
/// Sets up the global tracing subscriber with the format and level taken
/// from, in order of precedence, CLI arguments, the system configuration,
/// then built-in defaults. `RUST_LOG` overrides the effective level.
pub fn init(
    log_level_override: Option<&str>,
    log_format_override: Option<&str>,
    system_config: Option<&SystemConfig>,
) -> Result<()> {
    let log_level = if let Some(level) = log_level_override {
        level
    } else if let Some(config) = system_config {
        &config.logging.level
    } else {
        level::INFO
    };

    let log_format = if let Some(fmt) = log_format_override {
        fmt
    } else if let Some(config) = system_config {
        &config.logging.format
    } else {
        format::PRETTY
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let timer = ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string());

    match log_format {
        format::JSON => {
            tracing_subscriber::fmt()
                .json()
                .with_timer(timer)
                .with_env_filter(env_filter)
                .with_target(false)
                .with_current_span(true)
                .with_span_list(false)
                .init();
        }
        format::PRETTY => {
            tracing_subscriber::fmt()
                .pretty()
                .with_timer(timer)
                .with_env_filter(env_filter)
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_timer(timer)
                .with_env_filter(env_filter)
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .init();
        }
    }

    Ok(())
}

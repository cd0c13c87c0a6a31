use axum::http::{HeaderName, Method};
use std::net::IpAddr;
use url::Url;

use super::types::SystemConfig;
use crate::types::{Error, Result};

// Validation helper functions

/// Validate bind host is an IP literal or a plausible hostname
pub(crate) fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(Error::validation("server.host", "Host cannot be empty"));
    }
    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    let valid_hostname = host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if !valid_hostname {
        return Err(Error::validation(
            "server.host",
            format!("Invalid host '{}'. Expected an IP address or hostname", host),
        ));
    }
    Ok(())
}

/// Validate positive timeout value
pub(crate) fn validate_positive_timeout(value: u64, field: &str) -> Result<()> {
    if value == 0 {
        return Err(Error::validation(field, "Timeout must be greater than 0"));
    }
    Ok(())
}

/// Validate a numeric value against an inclusive range
pub(crate) fn validate_range(value: u64, field: &str, min: u64, max: u64) -> Result<()> {
    if value < min {
        return Err(Error::validation(
            field,
            format!("Value {} is below minimum allowed value {}", value, min),
        ));
    }
    if value > max {
        return Err(Error::validation(
            field,
            format!("Value {} exceeds maximum allowed value {}", value, max),
        ));
    }
    Ok(())
}

/// Parse the counter store connection string.
///
/// The port must be explicit: the store is addressed by host and port, and
/// a connection string relying on the scheme default is rejected.
pub(crate) fn parse_counter_store_url(raw: &str) -> Result<Url> {
    let field = "rate_limit.redis_url";
    let url = Url::parse(raw).map_err(|e| {
        Error::validation(field, format!("Failed to parse connection string: {}", e))
    })?;

    if !matches!(url.scheme(), "redis" | "rediss") {
        return Err(Error::validation(
            field,
            format!("Unsupported scheme '{}'. Expected redis or rediss", url.scheme()),
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::validation(field, "Connection string has no host"));
    }
    if url.port().is_none() {
        return Err(Error::validation(
            field,
            "Failed to parse port from connection string",
        ));
    }
    Ok(url)
}

/// Validate a CORS origin pattern; at most one `*` wildcard is allowed
pub(crate) fn validate_origin_pattern(pattern: &str, field: &str) -> Result<()> {
    if pattern.is_empty() {
        return Err(Error::validation(field, "Origin cannot be empty"));
    }
    if pattern.matches('*').count() > 1 {
        return Err(Error::validation(
            field,
            format!("Origin '{}' contains more than one wildcard", pattern),
        ));
    }
    Ok(())
}

pub(crate) fn validate_method(method: &str, field: &str) -> Result<()> {
    if method == "*" {
        return Ok(());
    }
    Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| Error::validation(field, format!("Invalid HTTP method '{}'", method)))?;
    Ok(())
}

pub(crate) fn validate_header_name(header: &str, field: &str) -> Result<()> {
    if header == "*" {
        return Ok(());
    }
    HeaderName::from_bytes(header.as_bytes())
        .map_err(|_| Error::validation(field, format!("Invalid header name '{}'", header)))?;
    Ok(())
}

/// Validate a media type such as `application/json`
pub(crate) fn validate_media_type(media_type: &str, field: &str) -> Result<()> {
    let mut parts = media_type.split('/');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(kind), Some(sub), None) if !kind.trim().is_empty() && !sub.trim().is_empty()
    );
    if !valid {
        return Err(Error::validation(
            field,
            format!("Invalid media type '{}'. Expected 'type/subtype'", media_type),
        ));
    }
    Ok(())
}

impl SystemConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Server
        validate_host(&self.server.host)?;
        if self.server.port == 0 {
            return Err(Error::validation(
                "server.port",
                "Port must be greater than 0",
            ));
        }
        validate_positive_timeout(self.server.request_timeout, "server.request_timeout")?;
        validate_positive_timeout(self.server.shutdown_timeout, "server.shutdown_timeout")?;
        for (i, media_type) in self.server.allowed_content_types.iter().enumerate() {
            validate_media_type(
                media_type,
                &format!("server.allowed_content_types[{}]", i),
            )?;
        }

        // CORS
        for (i, origin) in self.cors.allowed_origins.iter().enumerate() {
            validate_origin_pattern(origin, &format!("cors.allowed_origins[{}]", i))?;
        }
        for (i, method) in self.cors.allowed_methods.iter().enumerate() {
            validate_method(method, &format!("cors.allowed_methods[{}]", i))?;
        }
        for (i, header) in self.cors.allowed_headers.iter().enumerate() {
            validate_header_name(header, &format!("cors.allowed_headers[{}]", i))?;
        }
        for (i, header) in self.cors.exposed_headers.iter().enumerate() {
            validate_header_name(header, &format!("cors.exposed_headers[{}]", i))?;
        }
        if self.cors.allow_credentials {
            let wildcard = |values: &[String]| values.iter().any(|v| v == "*");
            if wildcard(&self.cors.allowed_origins)
                || wildcard(&self.cors.allowed_methods)
                || wildcard(&self.cors.allowed_headers)
                || wildcard(&self.cors.exposed_headers)
            {
                return Err(Error::validation(
                    "cors.allow_credentials",
                    "Credentials cannot be allowed together with a '*' origin, method, header or exposed header",
                ));
            }
        }
        validate_range(self.cors.max_age, "cors.max_age", 0, 86_400)?;

        // Rate limiting
        if self.rate_limit.is_active() {
            validate_range(
                self.rate_limit.requests as u64,
                "rate_limit.requests",
                1,
                1_000_000,
            )?;
            validate_positive_timeout(self.rate_limit.window, "rate_limit.window")?;
        }
        if let Some(url) = self.rate_limit.redis_url.as_deref() {
            if !url.is_empty() {
                parse_counter_store_url(url)?;
            }
        }

        // Logging
        if !matches!(
            self.logging.level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(Error::validation(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ),
            ));
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(Error::validation(
                "logging.format",
                format!(
                    "Invalid log format '{}'. Must be one of: json, pretty",
                    self.logging.format
                ),
            ));
        }

        Ok(())
    }
}

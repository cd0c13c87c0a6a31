use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Rate limit store error: {0}")]
    RateLimitStore(#[from] redis::RedisError),

    #[error("Application error: {0}")]
    Application(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Config file parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand for a validation failure on a single configuration field
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = Error::validation("server.port", "Port must be greater than 0");
        assert_eq!(
            err.to_string(),
            "Validation failed: server.port: Port must be greater than 0"
        );
    }

    #[test]
    fn test_config_error_conversion() {
        let err: Error = ConfigError::FileNotFound {
            path: "/missing.toml".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Config(ConfigError::FileNotFound { .. })));
        assert!(err.to_string().contains("/missing.toml"));
    }
}

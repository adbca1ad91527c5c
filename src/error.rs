//! Error types for the window limiter.

use thiserror::Error;

/// Main error type for limiter operations.
#[derive(Error, Debug)]
pub enum LimiterError {
    /// Quota parameters rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration source could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for LimiterError {
    fn from(err: ::config::ConfigError) -> Self {
        LimiterError::Config(err.to_string())
    }
}

/// Result type alias for limiter operations.
pub type Result<T> = std::result::Result<T, LimiterError>;

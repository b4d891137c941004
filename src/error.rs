//! Error types for the Contactgate service.

use thiserror::Error;

/// Main error type for Contactgate operations.
#[derive(Error, Debug)]
pub enum ContactGateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Mail delivery errors
    #[error("Mail delivery error: {0}")]
    Mail(String),

    /// Outbound HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ContactGateError {
    fn from(err: config::ConfigError) -> Self {
        ContactGateError::Config(err.to_string())
    }
}

/// Result type alias for Contactgate operations.
pub type Result<T> = std::result::Result<T, ContactGateError>;

//! Error types shared by HybridRec crates

use thiserror::Error;

/// Errors raised by the shared infrastructure (configuration, validation, database)
#[derive(Debug, Error)]
pub enum HybridRecError {
    /// A configuration value is missing, unparseable or out of range
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        /// Environment variable the value was read from, if any
        key: Option<String>,
    },

    /// Input data failed validation at a service boundary
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field: Option<String>,
    },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl HybridRecError {
    /// Build a validation error for a named field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Build a configuration error for an environment key
    pub fn configuration(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

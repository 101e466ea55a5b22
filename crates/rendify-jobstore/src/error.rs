//! Job store error types.

use thiserror::Error;

/// Result type for job store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during job store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to configure job store: {0}")]
    ConfigError(String),

    #[error("Stored record missing attribute: {0}")]
    MissingAttribute(String),

    #[error("Stored record has invalid attribute {name}: {value}")]
    InvalidAttribute { name: String, value: String },

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),
}

impl StoreError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn missing_attribute(name: impl Into<String>) -> Self {
        Self::MissingAttribute(name.into())
    }

    pub fn invalid_attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            name: name.into(),
            value: value.into(),
        }
    }
}

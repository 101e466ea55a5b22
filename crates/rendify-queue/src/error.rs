//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Failed to configure queue client: {0}")]
    ConfigError(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Visibility extension failed: {0}")]
    ExtendFailed(String),
}

impl QueueError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn receive_failed(msg: impl Into<String>) -> Self {
        Self::ReceiveFailed(msg.into())
    }

    pub fn delete_failed(msg: impl Into<String>) -> Self {
        Self::DeleteFailed(msg.into())
    }

    pub fn extend_failed(msg: impl Into<String>) -> Self {
        Self::ExtendFailed(msg.into())
    }
}

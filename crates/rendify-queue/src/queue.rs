//! SQS queue client.

use std::time::Duration;

use aws_config::SdkConfig;
use aws_sdk_sqs::Client;
use tracing::debug;

use crate::error::{QueueError, QueueResult};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// SQS queue URL
    pub queue_url: String,
    /// Long-poll wait per receive call
    pub wait_time: Duration,
    /// Visibility ceiling: initial visibility of a received message, and the
    /// value every lease extension resets to. Align with the queue's own
    /// visibility timeout setting.
    pub visibility_ceiling: Duration,
    /// How often the lease extender re-extends while work runs
    pub extend_period: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_url: String::new(),
            wait_time: Duration::from_secs(20),
            visibility_ceiling: Duration::from_secs(1800), // 30 minutes
            extend_period: Duration::from_secs(60),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Ok(Self {
            queue_url: std::env::var("SQS_QUEUE_URL")
                .map_err(|_| QueueError::config_error("SQS_QUEUE_URL not set"))?,
            wait_time: Duration::from_secs(
                std::env::var("QUEUE_WAIT_TIME_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(20),
            ),
            visibility_ceiling: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_CEILING_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            extend_period: Duration::from_secs(
                std::env::var("QUEUE_EXTEND_PERIOD_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        })
    }
}

/// One delivery pulled off the queue.
///
/// The receipt handle identifies this specific delivery; a redelivery of the
/// same job carries a different handle.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Raw message body (JSON)
    pub body: String,
    /// Opaque lease handle for delete/extend
    pub receipt_handle: String,
}

/// SQS queue client.
#[derive(Clone)]
pub struct JobQueue {
    client: Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new queue client from a shared SDK config.
    pub fn new(sdk_config: &SdkConfig, config: QueueConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
            config,
        }
    }

    /// Queue configuration in effect.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Long-poll for at most one message.
    ///
    /// The message becomes invisible to other consumers for the full
    /// visibility ceiling; the lease extender keeps that up for long encodes.
    pub async fn receive_one(&self) -> QueueResult<Option<ReceivedMessage>> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.config.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(self.config.wait_time.as_secs() as i32)
            .visibility_timeout(self.config.visibility_ceiling.as_secs() as i32)
            .send()
            .await
            .map_err(|e| QueueError::receive_failed(e.to_string()))?;

        let message = response.messages.and_then(|mut msgs| {
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.remove(0))
            }
        });

        match message {
            Some(msg) => {
                let receipt_handle = msg
                    .receipt_handle
                    .ok_or_else(|| QueueError::receive_failed("message without receipt handle"))?;
                debug!("Received message (handle {}...)", truncate_handle(&receipt_handle));
                Ok(Some(ReceivedMessage {
                    body: msg.body.unwrap_or_default(),
                    receipt_handle,
                }))
            }
            None => Ok(None),
        }
    }

    /// Delete a delivery, removing it from the queue for good.
    pub async fn delete(&self, receipt_handle: &str) -> QueueResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.config.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::delete_failed(e.to_string()))?;

        debug!("Deleted message (handle {}...)", truncate_handle(receipt_handle));
        Ok(())
    }

    /// Reset a delivery's visibility timeout.
    pub async fn extend_visibility(
        &self,
        receipt_handle: &str,
        timeout: Duration,
    ) -> QueueResult<()> {
        self.client
            .change_message_visibility()
            .queue_url(&self.config.queue_url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(timeout.as_secs() as i32)
            .send()
            .await
            .map_err(|e| QueueError::extend_failed(e.to_string()))?;

        Ok(())
    }
}

fn truncate_handle(handle: &str) -> &str {
    &handle[..handle.len().min(16)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.wait_time, Duration::from_secs(20));
        assert_eq!(config.visibility_ceiling, Duration::from_secs(1800));
        assert_eq!(config.extend_period, Duration::from_secs(60));
    }

    #[test]
    fn test_truncate_handle() {
        assert_eq!(truncate_handle("short"), "short");
        assert_eq!(truncate_handle("0123456789abcdef0123"), "0123456789abcdef");
    }
}

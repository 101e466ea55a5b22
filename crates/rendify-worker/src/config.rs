//! Worker configuration.

use std::time::Duration;

use rendify_models::Intensity;

/// Worker configuration.
///
/// Knobs with safe defaults; the required infrastructure settings (queue URL,
/// bucket, table) live with their respective client configs and are fatal at
/// startup when absent.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Encoder effort profile applied to every job
    pub intensity: Intensity,
    /// Back-off after a failed receive call
    pub receive_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            intensity: Intensity::High,
            receive_backoff: Duration::from_secs(5),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            intensity: std::env::var("TRANSCODE_INTENSITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            receive_backoff: Duration::from_secs(
                std::env::var("WORKER_RECEIVE_BACKOFF_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.intensity, Intensity::High);
        assert_eq!(config.receive_backoff, Duration::from_secs(5));
    }
}

//! Worker error types.

use thiserror::Error;

use rendify_media::MediaError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Storage error: {0}")]
    Storage(#[from] rendify_storage::StorageError),

    #[error("Job store error: {0}")]
    Store(#[from] rendify_jobstore::StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] rendify_queue::QueueError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Failure text recorded on the job, including the captured encoder
    /// output when there is any.
    pub fn failure_text(&self) -> String {
        match self {
            WorkerError::Media(media) => match media.diagnostic() {
                Some(diag) => format!("{}: {}", media, diag),
                None => media.to_string(),
            },
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_text_carries_encoder_output() {
        let err = WorkerError::from(MediaError::ffmpeg_failed(
            "FFmpeg exited with status 1",
            Some("input.mp4: Invalid data found when processing input".to_string()),
            Some(1),
        ));

        let text = err.failure_text();
        assert!(text.contains("status 1"));
        assert!(text.contains("Invalid data found"));
    }

    #[test]
    fn test_failure_text_without_diagnostic() {
        let err = WorkerError::from(MediaError::FfmpegNotFound);
        assert_eq!(err.failure_text(), "FFmpeg not found in PATH");
    }
}

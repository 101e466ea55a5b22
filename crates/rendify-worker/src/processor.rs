//! Per-message processing pipeline and consumer loop.

use tokio::sync::watch;
use tracing::{error, info, info_span, Instrument};

use rendify_jobstore::JobStore;
use rendify_media::transcode;
use rendify_models::{resolve_preset, Job, JobUpdate, TranscodeMessage};
use rendify_queue::{JobQueue, LeaseExtender, ReceivedMessage};
use rendify_storage::StorageClient;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// The worker's job processor: one sequential consumer loop, one message in
/// flight at a time.
///
/// All infrastructure clients are constructed once (in `main`, from a shared
/// SDK config) and owned here; nothing reaches for ambient globals.
pub struct Processor {
    queue: JobQueue,
    storage: StorageClient,
    jobs: JobStore,
    config: WorkerConfig,
}

impl Processor {
    /// Create a new processor.
    pub fn new(
        queue: JobQueue,
        storage: StorageClient,
        jobs: JobStore,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            storage,
            jobs,
            config,
        }
    }

    /// Run the consumer loop until shutdown is signalled.
    ///
    /// Each receive long-polls for at most one message; errors from the
    /// receive call itself back off briefly and keep polling. Shutdown is
    /// honored between messages, never mid-job.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> WorkerResult<()> {
        info!("Worker online; polling {}", self.queue.config().queue_url);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Shutdown signal received, stopping consumer");
                        break;
                    }
                }
                received = self.queue.receive_one() => {
                    match received {
                        Ok(Some(message)) => self.dispatch(message).await,
                        Ok(None) => {}
                        Err(e) => {
                            error!("Receive failed: {}", e);
                            tokio::time::sleep(self.config.receive_backoff).await;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Dispatch one delivery inside an isolated failure scope.
    ///
    /// Malformed bodies are deleted immediately with no job-state write (a
    /// poison-message defense, not a retry case). Any error escaping the
    /// pipeline degrades the job to FAILED, best effort — the loop itself
    /// never dies on a bad message.
    pub async fn dispatch(&self, received: ReceivedMessage) {
        let message = match TranscodeMessage::from_json(&received.body) {
            Ok(m) => m,
            Err(e) => {
                error!("Malformed message body ({}); deleting. body={:?}", e, received.body);
                if let Err(e) = self.queue.delete(&received.receipt_handle).await {
                    error!("Failed to delete malformed message: {}", e);
                }
                return;
            }
        };

        let job_id = message.job_id.clone();
        let span = info_span!("job", job_id = %job_id);

        if let Err(e) = self
            .process(&message, &received.receipt_handle)
            .instrument(span)
            .await
        {
            let failure = e.failure_text();
            error!(job_id = %job_id, "Processing failed: {}", failure);

            // Best-effort degrade; a job already DONE is left untouched by
            // the store's conditional write.
            if let Err(update_err) = self.jobs.update(&job_id, JobUpdate::failed(failure)).await {
                error!(job_id = %job_id, "Failed to record job failure: {}", update_err);
            }
        }
    }

    /// Process one well-formed message end to end.
    async fn process(&self, message: &TranscodeMessage, receipt_handle: &str) -> WorkerResult<()> {
        // Idempotency guard: a duplicate or crash-redelivered message for a
        // job that is already claimed or finished does no work at all.
        let existing = self.jobs.get(&message.job_id).await?;
        if is_redundant_delivery(existing.as_ref()) {
            let status = existing.map(|j| j.status).unwrap_or_default();
            info!("Job already {}; deleting duplicate delivery", status);
            self.queue.delete(receipt_handle).await?;
            return Ok(());
        }

        info!(
            "Starting job (preset={}, input={})",
            message.preset, message.input_key
        );
        self.jobs
            .update(&message.job_id, JobUpdate::running())
            .await?;

        // Keep the delivery invisible to other consumers for the duration.
        let queue_config = self.queue.config();
        let extender = LeaseExtender::spawn(
            self.queue.clone(),
            receipt_handle.to_string(),
            queue_config.extend_period,
            queue_config.visibility_ceiling,
        );

        let outcome = self.encode_and_store(message).await;
        let finalized = self.finalize(message, receipt_handle, outcome).await;

        // Always stopped before the loop takes the next message.
        extender.stop().await;

        finalized
    }

    /// Download, encode and upload within a job-scoped scratch directory.
    ///
    /// The directory is removed on every exit path when the guard drops.
    async fn encode_and_store(&self, message: &TranscodeMessage) -> WorkerResult<String> {
        let scratch = tempfile::tempdir()?;
        let local_input = scratch.path().join("input.mp4");
        let local_output = scratch.path().join("output.mp4");

        self.storage
            .download_file(&message.input_key, &local_input)
            .await?;

        let spec = resolve_preset(&message.preset);
        transcode(&local_input, &local_output, &spec, self.config.intensity).await?;

        let output_key = message.job_id.output_key();
        self.storage
            .upload_file(&local_output, &output_key, "video/mp4")
            .await?;

        Ok(output_key)
    }

    /// Persist the outcome and settle the delivery.
    ///
    /// Success order matters: upload happened already, then DONE is written,
    /// then the message is deleted — a crash in between leaves the message
    /// redeliverable and every step re-runnable. On failure the message is
    /// deliberately retained for queue-native redelivery and DLQ routing.
    async fn finalize(
        &self,
        message: &TranscodeMessage,
        receipt_handle: &str,
        outcome: WorkerResult<String>,
    ) -> WorkerResult<()> {
        match outcome {
            Ok(output_key) => {
                self.jobs
                    .update(&message.job_id, JobUpdate::done(&output_key))
                    .await?;
                self.queue.delete(receipt_handle).await?;
                info!("Job complete (outputKey={})", output_key);
                Ok(())
            }
            Err(e) => {
                let failure = e.failure_text();
                error!("Job failed: {}", failure);
                self.jobs
                    .update(&message.job_id, JobUpdate::failed(failure))
                    .await?;
                Ok(())
            }
        }
    }
}

/// Decide whether a delivery is redundant given the stored job.
///
/// RUNNING means another attempt has claimed the job; DONE means it finished.
/// Absent, PENDING and FAILED all proceed (FAILED is the retry path, absent
/// is handled defensively). Two near-simultaneous duplicates can both pass
/// this check before either writes RUNNING; that bounded double-encode is
/// accepted rather than closed with a claim lock.
fn is_redundant_delivery(existing: Option<&Job>) -> bool {
    existing
        .map(|job| job.status.claimed_or_complete())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rendify_models::{JobId, JobStatus};

    fn job_with_status(status: JobStatus) -> Job {
        let mut job = Job::new(JobId::from_string("J1"), "u1", "input/a.mp4", "mp4-720p");
        job.status = status;
        job
    }

    #[test]
    fn test_redundant_when_running_or_done() {
        assert!(is_redundant_delivery(Some(&job_with_status(JobStatus::Running))));
        assert!(is_redundant_delivery(Some(&job_with_status(JobStatus::Done))));
    }

    #[test]
    fn test_processable_states() {
        assert!(!is_redundant_delivery(None));
        assert!(!is_redundant_delivery(Some(&job_with_status(JobStatus::Pending))));
        assert!(!is_redundant_delivery(Some(&job_with_status(JobStatus::Failed))));
    }
}

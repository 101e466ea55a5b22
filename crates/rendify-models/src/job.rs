//! Job records and status transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a transcode job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deterministic object key for this job's rendition.
    ///
    /// Reprocessing the same job overwrites the same key, which is what makes
    /// the DONE write and the upload safe to re-run.
    pub fn output_key(&self) -> String {
        format!("output/{}.mp4", self.0)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted job status.
///
/// Transitions form a DAG: PENDING -> RUNNING -> {DONE, FAILED}. DONE is
/// absorbing; the job store rejects any write against a DONE record. FAILED
/// jobs may be picked up again when the queue redelivers their message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Created by the API, not yet claimed by a worker
    #[default]
    Pending,
    /// Claimed by a worker, encode in progress
    Running,
    /// Rendition uploaded, output key recorded
    Done,
    /// Processing failed; error field holds the diagnostic
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Done => "DONE",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(JobStatus::Pending),
            "RUNNING" => Some(JobStatus::Running),
            "DONE" => Some(JobStatus::Done),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Terminal states receive no further transitions from a live attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// A redelivered message for a job in one of these states is redundant
    /// and must be dropped without reprocessing.
    pub fn claimed_or_complete(&self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Done)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted transcode job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job ID (table key)
    pub job_id: JobId,

    /// Owning user
    pub user_id: String,

    /// Object key of the uploaded source
    pub input_key: String,

    /// Requested preset name
    pub preset: String,

    /// Current status
    #[serde(default)]
    pub status: JobStatus,

    /// Rendition key; present iff status == DONE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,

    /// Diagnostic text; set on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp (stamped on every write)
    pub updated_at: DateTime<Utc>,

    /// When a worker claimed the job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the job reached DONE or FAILED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new PENDING job record.
    pub fn new(
        job_id: JobId,
        user_id: impl Into<String>,
        input_key: impl Into<String>,
        preset: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            user_id: user_id.into(),
            input_key: input_key.into(),
            preset: preset.into(),
            status: JobStatus::Pending,
            output_key: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Field set for a conditional job update.
///
/// Only the fields that are `Some` are written; `updatedAt` is always stamped
/// by the store. Constructors cover the three transitions the worker makes.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub output_key: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobUpdate {
    /// Claim the job: RUNNING with `startedAt` stamped.
    pub fn running() -> Self {
        Self {
            status: Some(JobStatus::Running),
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Finish successfully: DONE with the rendition key and `finishedAt`.
    pub fn done(output_key: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Done),
            output_key: Some(output_key.into()),
            finished_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Finish unsuccessfully: FAILED with a diagnostic and `finishedAt`.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            finished_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_key_is_deterministic() {
        let id = JobId::from_string("J1");
        assert_eq!(id.output_key(), "output/J1.mp4");
        assert_eq!(id.output_key(), JobId::from_string("J1").output_key());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&JobStatus::Running).unwrap();
        assert_eq!(json, "\"RUNNING\"");
        assert_eq!(JobStatus::parse("DONE"), Some(JobStatus::Done));
        assert_eq!(JobStatus::parse("done"), None);
    }

    #[test]
    fn test_redundant_delivery_states() {
        assert!(JobStatus::Running.claimed_or_complete());
        assert!(JobStatus::Done.claimed_or_complete());
        assert!(!JobStatus::Pending.claimed_or_complete());
        assert!(!JobStatus::Failed.claimed_or_complete());
    }

    #[test]
    fn test_transition_updates() {
        let running = JobUpdate::running();
        assert_eq!(running.status, Some(JobStatus::Running));
        assert!(running.started_at.is_some());
        assert!(running.output_key.is_none());

        let done = JobUpdate::done("output/J1.mp4");
        assert_eq!(done.status, Some(JobStatus::Done));
        assert_eq!(done.output_key.as_deref(), Some("output/J1.mp4"));
        assert!(done.finished_at.is_some());

        let failed = JobUpdate::failed("ffmpeg exited with status 1");
        assert_eq!(failed.status, Some(JobStatus::Failed));
        assert!(failed.error.is_some());
        assert!(failed.output_key.is_none());
    }

    #[test]
    fn test_job_record_serde_names() {
        let job = Job::new(JobId::from_string("J1"), "u1", "input/a.mp4", "mp4-480p");
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["jobId"], "J1");
        assert_eq!(value["inputKey"], "input/a.mp4");
        assert_eq!(value["status"], "PENDING");
        assert!(value.get("outputKey").is_none());
    }
}

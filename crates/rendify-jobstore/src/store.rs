//! Job store over a DynamoDB table keyed by `jobId`.

use std::collections::HashMap;

use aws_config::SdkConfig;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};

use rendify_models::{Job, JobId, JobStatus, JobUpdate};

use crate::error::{StoreError, StoreResult};

/// Configuration for the job store.
#[derive(Debug, Clone)]
pub struct JobStoreConfig {
    /// DynamoDB table name
    pub table: String,
}

impl JobStoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Ok(Self {
            table: std::env::var("JOBS_TABLE")
                .map_err(|_| StoreError::config_error("JOBS_TABLE not set"))?,
        })
    }
}

/// Job state store.
///
/// Reads are not transactionally isolated from concurrent writers; the DONE
/// guard on [`JobStore::update`] is what closes the remaining race window.
#[derive(Clone)]
pub struct JobStore {
    client: Client,
    table: String,
}

impl JobStore {
    /// Create a new job store from a shared SDK config.
    pub fn new(sdk_config: &SdkConfig, config: JobStoreConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
            table: config.table,
        }
    }

    /// Fetch a job record.
    pub async fn get(&self, job_id: &JobId) -> StoreResult<Option<Job>> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("jobId", AttributeValue::S(job_id.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::AwsSdk(e.to_string()))?;

        match response.item {
            Some(item) => Ok(Some(from_item(&item)?)),
            None => Ok(None),
        }
    }

    /// Write an initial job record.
    ///
    /// Producer-side operation: the API creates the PENDING record with this
    /// before enqueueing the message. The worker never calls it.
    pub async fn put(&self, job: &Job) -> StoreResult<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(to_item(job)))
            .send()
            .await
            .map_err(|e| StoreError::AwsSdk(e.to_string()))?;

        debug!(job_id = %job.job_id, "Created job record");
        Ok(())
    }

    /// Apply a conditional field-set update, always stamping `updatedAt`.
    ///
    /// The write carries the condition
    /// `attribute_not_exists(jobId) OR #st <> :done`: a record that is
    /// already DONE is never mutated. A rejected write is logged and
    /// swallowed — it is an expected outcome of duplicate deliveries, not an
    /// error surfaced to the caller.
    pub async fn update(&self, job_id: &JobId, update: JobUpdate) -> StoreResult<()> {
        let expr = build_update_expression(&update, Utc::now());

        let result = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("jobId", AttributeValue::S(job_id.to_string()))
            .update_expression(&expr.expression)
            .condition_expression(DONE_GUARD_CONDITION)
            .set_expression_attribute_names(Some(expr.names))
            .set_expression_attribute_values(Some(expr.values))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_conditional_check_failed_exception() {
                    warn!(
                        job_id = %job_id,
                        "Conditional update rejected (job already DONE); ignoring"
                    );
                    Ok(())
                } else {
                    Err(StoreError::AwsSdk(service_err.to_string()))
                }
            }
        }
    }
}

/// Condition applied to every update: never touch a DONE record. A missing
/// record passes, so a defensive RUNNING write may create one.
const DONE_GUARD_CONDITION: &str = "attribute_not_exists(jobId) OR #st <> :done";

/// A built SET expression with its placeholder maps.
#[derive(Debug)]
struct UpdateExpression {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

/// Build the SET expression for an update, stamping `updatedAt`.
///
/// Every attribute goes through an expression placeholder since `status` and
/// `error` are DynamoDB reserved words. The DONE-guard placeholders (`#st`,
/// `:done`) are merged in alongside the field placeholders.
fn build_update_expression(update: &JobUpdate, updated_at: DateTime<Utc>) -> UpdateExpression {
    let mut fields: Vec<(&str, AttributeValue)> = Vec::new();

    if let Some(status) = update.status {
        fields.push(("status", AttributeValue::S(status.as_str().to_string())));
    }
    if let Some(ref output_key) = update.output_key {
        fields.push(("outputKey", AttributeValue::S(output_key.clone())));
    }
    if let Some(ref error) = update.error {
        fields.push(("error", AttributeValue::S(error.clone())));
    }
    if let Some(started_at) = update.started_at {
        fields.push(("startedAt", AttributeValue::S(format_timestamp(started_at))));
    }
    if let Some(finished_at) = update.finished_at {
        fields.push(("finishedAt", AttributeValue::S(format_timestamp(finished_at))));
    }
    fields.push(("updatedAt", AttributeValue::S(format_timestamp(updated_at))));

    let mut names = HashMap::new();
    let mut values = HashMap::new();
    let mut assignments = Vec::with_capacity(fields.len());

    for (i, (name, value)) in fields.into_iter().enumerate() {
        let nk = format!("#k{}", i + 1);
        let vk = format!(":v{}", i + 1);
        assignments.push(format!("{} = {}", nk, vk));
        names.insert(nk, name.to_string());
        values.insert(vk, value);
    }

    names.insert("#st".to_string(), "status".to_string());
    values.insert(
        ":done".to_string(),
        AttributeValue::S(JobStatus::Done.as_str().to_string()),
    );

    UpdateExpression {
        expression: format!("SET {}", assignments.join(", ")),
        names,
        values,
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(name: &str, value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::invalid_attribute(name, value))
}

/// Marshal a job record into a DynamoDB item.
fn to_item(job: &Job) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert("jobId".to_string(), AttributeValue::S(job.job_id.to_string()));
    item.insert("userId".to_string(), AttributeValue::S(job.user_id.clone()));
    item.insert("inputKey".to_string(), AttributeValue::S(job.input_key.clone()));
    item.insert("preset".to_string(), AttributeValue::S(job.preset.clone()));
    item.insert(
        "status".to_string(),
        AttributeValue::S(job.status.as_str().to_string()),
    );
    item.insert(
        "createdAt".to_string(),
        AttributeValue::S(format_timestamp(job.created_at)),
    );
    item.insert(
        "updatedAt".to_string(),
        AttributeValue::S(format_timestamp(job.updated_at)),
    );
    if let Some(ref output_key) = job.output_key {
        item.insert("outputKey".to_string(), AttributeValue::S(output_key.clone()));
    }
    if let Some(ref error) = job.error {
        item.insert("error".to_string(), AttributeValue::S(error.clone()));
    }
    if let Some(started_at) = job.started_at {
        item.insert(
            "startedAt".to_string(),
            AttributeValue::S(format_timestamp(started_at)),
        );
    }
    if let Some(finished_at) = job.finished_at {
        item.insert(
            "finishedAt".to_string(),
            AttributeValue::S(format_timestamp(finished_at)),
        );
    }
    item
}

/// Unmarshal a DynamoDB item into a job record.
fn from_item(item: &HashMap<String, AttributeValue>) -> StoreResult<Job> {
    let get_s = |name: &str| -> StoreResult<String> {
        item.get(name)
            .and_then(|v| v.as_s().ok())
            .cloned()
            .ok_or_else(|| StoreError::missing_attribute(name))
    };
    let get_opt_s = |name: &str| -> Option<String> {
        item.get(name).and_then(|v| v.as_s().ok()).cloned()
    };

    let status_raw = get_s("status")?;
    let status = JobStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::invalid_attribute("status", &status_raw))?;

    let started_at = match get_opt_s("startedAt") {
        Some(s) => Some(parse_timestamp("startedAt", &s)?),
        None => None,
    };
    let finished_at = match get_opt_s("finishedAt") {
        Some(s) => Some(parse_timestamp("finishedAt", &s)?),
        None => None,
    };

    Ok(Job {
        job_id: JobId::from_string(get_s("jobId")?),
        user_id: get_s("userId")?,
        input_key: get_s("inputKey")?,
        preset: get_s("preset")?,
        status,
        output_key: get_opt_s("outputKey"),
        error: get_opt_s("error"),
        created_at: parse_timestamp("createdAt", &get_s("createdAt")?)?,
        updated_at: parse_timestamp("updatedAt", &get_s("updatedAt")?)?,
        started_at,
        finished_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_round_trip() {
        let mut job = Job::new(JobId::from_string("J1"), "u1", "input/a.mp4", "mp4-480p");
        job.status = JobStatus::Done;
        job.output_key = Some("output/J1.mp4".to_string());
        job.started_at = Some(Utc::now());
        job.finished_at = Some(Utc::now());

        let restored = from_item(&to_item(&job)).unwrap();
        assert_eq!(restored.job_id, job.job_id);
        assert_eq!(restored.status, JobStatus::Done);
        assert_eq!(restored.output_key.as_deref(), Some("output/J1.mp4"));
        assert_eq!(restored.preset, "mp4-480p");
        assert!(restored.started_at.is_some());
    }

    #[test]
    fn test_from_item_rejects_bad_status() {
        let mut job = Job::new(JobId::from_string("J1"), "u1", "input/a.mp4", "mp4-720p");
        job.status = JobStatus::Pending;
        let mut item = to_item(&job);
        item.insert("status".to_string(), AttributeValue::S("EXPLODED".into()));

        assert!(matches!(
            from_item(&item),
            Err(StoreError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_update_expression_stamps_updated_at() {
        let expr = build_update_expression(&JobUpdate::default(), Utc::now());

        // Even an empty field set writes updatedAt
        assert_eq!(expr.expression, "SET #k1 = :v1");
        assert_eq!(expr.names.get("#k1").unwrap(), "updatedAt");
    }

    #[test]
    fn test_update_expression_for_done_transition() {
        let expr = build_update_expression(&JobUpdate::done("output/J1.mp4"), Utc::now());

        let set_names: Vec<_> = expr
            .names
            .iter()
            .filter(|(k, _)| k.starts_with("#k"))
            .map(|(_, v)| v.as_str())
            .collect();
        assert!(set_names.contains(&"status"));
        assert!(set_names.contains(&"outputKey"));
        assert!(set_names.contains(&"finishedAt"));
        assert!(set_names.contains(&"updatedAt"));
        assert!(!set_names.contains(&"error"));
    }

    #[test]
    fn test_done_guard_placeholders_present() {
        let expr = build_update_expression(&JobUpdate::running(), Utc::now());

        assert_eq!(expr.names.get("#st").unwrap(), "status");
        assert_eq!(
            expr.values.get(":done").unwrap(),
            &AttributeValue::S("DONE".to_string())
        );
        assert!(DONE_GUARD_CONDITION.contains("#st <> :done"));
    }

    #[test]
    fn test_timestamp_format() {
        let ts = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(ts), "2025-01-01T00:00:00Z");
        assert_eq!(parse_timestamp("createdAt", "2025-01-01T00:00:00Z").unwrap(), ts);
    }
}

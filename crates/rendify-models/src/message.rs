//! Queue message payload.

use serde::{Deserialize, Serialize};

use crate::job::JobId;
use crate::preset::DEFAULT_PRESET;

/// Body of a transcode request message.
///
/// Mirrors the job-definition fields; the receipt handle identifying the
/// specific delivery travels alongside, never inside, the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeMessage {
    /// Job to process
    pub job_id: JobId,

    /// Object key of the uploaded source
    pub input_key: String,

    /// Requested preset name; producers may omit it
    #[serde(default = "default_preset_name")]
    pub preset: String,

    /// Requesting user
    pub user_id: String,
}

fn default_preset_name() -> String {
    DEFAULT_PRESET.to_string()
}

impl TranscodeMessage {
    /// Parse a raw message body.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_body() {
        let body = r#"{"jobId":"J1","inputKey":"input/a.mp4","preset":"mp4-480p","userId":"u1"}"#;
        let msg = TranscodeMessage::from_json(body).unwrap();
        assert_eq!(msg.job_id.as_str(), "J1");
        assert_eq!(msg.input_key, "input/a.mp4");
        assert_eq!(msg.preset, "mp4-480p");
        assert_eq!(msg.user_id, "u1");
    }

    #[test]
    fn test_missing_preset_defaults() {
        let body = r#"{"jobId":"J1","inputKey":"input/a.mp4","userId":"u1"}"#;
        let msg = TranscodeMessage::from_json(body).unwrap();
        assert_eq!(msg.preset, DEFAULT_PRESET);
    }

    #[test]
    fn test_malformed_body_rejected() {
        assert!(TranscodeMessage::from_json("not json").is_err());
        assert!(TranscodeMessage::from_json(r#"{"jobId":"J1"}"#).is_err());
    }
}

//! Polled job status record.
//!
//! This is the snapshot a poller sees: one record per job, written only by
//! the worker that owns the job and read by many pollers. The record is
//! stored as a flat string map (one Redis hash per job), so it carries pure
//! conversions to and from that representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error_code::ErrorCode;
use crate::job::JobId;

/// Maximum length of the stored error message.
pub const ERROR_MESSAGE_MAX_LEN: usize = 500;

/// Job lifecycle status.
///
/// Transitions are strictly forward: queued to working to done or error.
/// Once terminal, the record never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a worker
    #[default]
    Queued,
    /// Owned by exactly one worker
    Working,
    /// Clip uploaded, object_key set
    Done,
    /// Failed with an error_code
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Working => "working",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "working" => Some(JobStatus::Working),
            "done" => Some(JobStatus::Done),
            "error" => Some(JobStatus::Error),
            _ => None,
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One job's status record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job this record belongs to
    pub job_id: JobId,
    /// Current lifecycle status
    pub status: JobStatus,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable stage label (e.g. "downloading")
    pub stage: String,
    /// Taxonomy code, present only when status = error
    pub error_code: Option<ErrorCode>,
    /// Truncated error detail, present only when status = error
    pub error_message: Option<String>,
    /// Storage key of the finished clip, present only when status = done
    pub object_key: Option<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a fresh queued record.
    pub fn queued(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Queued,
            progress: 0,
            stage: "queued".to_string(),
            error_code: None,
            error_message: None,
            object_key: None,
            created_at: Utc::now(),
        }
    }

    /// Check if the record is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Truncate an error message to the stored limit on a char boundary.
    pub fn truncate_message(message: &str) -> String {
        if message.chars().count() <= ERROR_MESSAGE_MAX_LEN {
            message.to_string()
        } else {
            message.chars().take(ERROR_MESSAGE_MAX_LEN).collect()
        }
    }

    /// Flatten into (field, value) pairs for hash storage.
    ///
    /// Optional fields are omitted entirely rather than written empty.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("job_id".to_string(), self.job_id.to_string()),
            ("status".to_string(), self.status.as_str().to_string()),
            ("progress".to_string(), self.progress.to_string()),
            ("stage".to_string(), self.stage.clone()),
            ("created_at".to_string(), self.created_at.to_rfc3339()),
        ];
        if let Some(code) = self.error_code {
            fields.push(("error_code".to_string(), code.as_str().to_string()));
        }
        if let Some(ref msg) = self.error_message {
            fields.push(("error_message".to_string(), Self::truncate_message(msg)));
        }
        if let Some(ref key) = self.object_key {
            fields.push(("object_key".to_string(), key.clone()));
        }
        fields
    }

    /// Rebuild from the stored string map.
    ///
    /// Returns `None` if required fields are missing or unparseable.
    pub fn from_fields(fields: &std::collections::HashMap<String, String>) -> Option<Self> {
        let job_id = JobId::from_string(fields.get("job_id")?.clone());
        let status = JobStatus::parse(fields.get("status")?)?;
        let progress = fields.get("progress")?.parse().ok()?;
        let stage = fields.get("stage").cloned().unwrap_or_default();
        let created_at = fields
            .get("created_at")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))?;

        Some(Self {
            job_id,
            status,
            progress,
            stage,
            error_code: fields.get("error_code").and_then(|s| ErrorCode::parse(s)),
            error_message: fields.get("error_message").cloned(),
            object_key: fields.get("object_key").cloned(),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn to_map(fields: Vec<(String, String)>) -> HashMap<String, String> {
        fields.into_iter().collect()
    }

    #[test]
    fn queued_record_defaults() {
        let record = JobRecord::queued(JobId::from_string("j1"));
        assert_eq!(record.status, JobStatus::Queued);
        assert_eq!(record.progress, 0);
        assert!(!record.is_terminal());
        assert!(record.error_code.is_none());
        assert!(record.object_key.is_none());
    }

    #[test]
    fn fields_round_trip() {
        let mut record = JobRecord::queued(JobId::from_string("j1"));
        record.status = JobStatus::Error;
        record.progress = 10;
        record.stage = "downloading".to_string();
        record.error_code = Some(ErrorCode::DownloadUnavailable);
        record.error_message = Some("video unavailable".to_string());

        let back = JobRecord::from_fields(&to_map(record.to_fields())).unwrap();
        assert_eq!(back.job_id, record.job_id);
        assert_eq!(back.status, JobStatus::Error);
        assert_eq!(back.progress, 10);
        assert_eq!(back.stage, "downloading");
        assert_eq!(back.error_code, Some(ErrorCode::DownloadUnavailable));
        assert_eq!(back.error_message.as_deref(), Some("video unavailable"));
        assert!(back.object_key.is_none());
    }

    #[test]
    fn done_record_carries_object_key() {
        let mut record = JobRecord::queued(JobId::from_string("j2"));
        record.status = JobStatus::Done;
        record.progress = 100;
        record.object_key = Some("clips/j2.mp4".to_string());

        let back = JobRecord::from_fields(&to_map(record.to_fields())).unwrap();
        assert_eq!(back.status, JobStatus::Done);
        assert_eq!(back.object_key.as_deref(), Some("clips/j2.mp4"));
    }

    #[test]
    fn long_messages_are_truncated_on_write() {
        let mut record = JobRecord::queued(JobId::from_string("j3"));
        record.status = JobStatus::Error;
        record.error_code = Some(ErrorCode::DownloadUnknown);
        record.error_message = Some("x".repeat(2000));

        let map = to_map(record.to_fields());
        assert_eq!(map["error_message"].chars().count(), ERROR_MESSAGE_MAX_LEN);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut record = JobRecord::queued(JobId::from_string("j4"));
        record.stage = "queued".to_string();
        let mut map = to_map(record.to_fields());
        map.insert("status".to_string(), "retrying".to_string());
        assert!(JobRecord::from_fields(&map).is_none());
    }

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Working.is_terminal());
    }
}

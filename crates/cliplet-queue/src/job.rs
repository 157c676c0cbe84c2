//! Queue job payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cliplet_models::{ClipRequest, JobId};

/// One clip job as carried on the queue.
///
/// The payload is everything the worker needs to run the pipeline; the
/// polled status lives separately in the state store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Source media URL
    pub url: String,
    /// Clip start offset in seconds
    pub start_seconds: f64,
    /// Clip end offset in seconds
    pub end_seconds: f64,
    /// Explicit extractor format identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_id: Option<String>,
    /// Target resolution label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl ClipJob {
    /// Create a job from a validated request.
    pub fn from_request(request: &ClipRequest) -> Self {
        Self {
            job_id: JobId::new(),
            url: request.url.clone(),
            start_seconds: request.start_seconds,
            end_seconds: request.end_seconds,
            format_id: request.format_id.clone(),
            resolution: request.resolution.clone(),
            created_at: Utc::now(),
        }
    }

    /// Requested clip duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_job_serde_roundtrip() {
        let job = ClipJob {
            job_id: JobId::new(),
            url: "https://youtube.com/watch?v=abc123def45".to_string(),
            start_seconds: 10.0,
            end_seconds: 70.0,
            format_id: None,
            resolution: Some("720p".to_string()),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&job).expect("serialize ClipJob");
        let decoded: ClipJob = serde_json::from_str(&json).expect("deserialize ClipJob");

        assert_eq!(decoded.job_id, job.job_id);
        assert_eq!(decoded.url, job.url);
        assert_eq!(decoded.start_seconds, job.start_seconds);
        assert_eq!(decoded.end_seconds, job.end_seconds);
        assert_eq!(decoded.resolution, job.resolution);
        assert_eq!(decoded.created_at, job.created_at);
        assert!((decoded.duration() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let job = ClipJob {
            job_id: JobId::from_string("j1"),
            url: "https://example.com/v".to_string(),
            start_seconds: 0.0,
            end_seconds: 5.0,
            format_id: None,
            resolution: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&job).unwrap();
        assert!(!json.contains("format_id"));
        assert!(!json.contains("resolution"));
    }
}

//! Per-job status records in Redis.
//!
//! One hash per job, written by the single worker that owns the job and
//! read by pollers. Fields are last-write-wins; no cross-field transactions
//! are needed. Every write refreshes the retention TTL, so a record expires
//! a fixed window after its final (terminal) write.

use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use cliplet_models::{ErrorCode, JobId, JobRecord, JobStatus};

use crate::error::QueueResult;

/// State store configuration.
#[derive(Debug, Clone)]
pub struct StateStoreConfig {
    /// Redis URL
    pub redis_url: String,
    /// Record retention, refreshed on every write
    pub retention: Duration,
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            retention: Duration::from_secs(86400),
        }
    }
}

impl StateStoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            retention: Duration::from_secs(
                std::env::var("CLIPLET_JOB_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(86400),
            ),
        }
    }
}

/// Job state store client.
#[derive(Clone)]
pub struct JobStateStore {
    client: redis::Client,
    retention_secs: i64,
}

impl JobStateStore {
    /// Create a new state store.
    pub fn new(config: StateStoreConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self {
            client,
            retention_secs: config.retention.as_secs() as i64,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(StateStoreConfig::from_env())
    }

    /// Key for a job's record.
    pub fn record_key(job_id: &JobId) -> String {
        format!("cliplet:job:{}", job_id)
    }

    /// Write the initial queued record.
    pub async fn create_queued(&self, job_id: &JobId) -> QueueResult<()> {
        let record = JobRecord::queued(job_id.clone());
        self.write_fields(job_id, record.to_fields()).await
    }

    /// Claim the job: queued becomes working.
    pub async fn mark_working(&self, job_id: &JobId) -> QueueResult<()> {
        self.write_fields(
            job_id,
            vec![
                ("status".to_string(), JobStatus::Working.as_str().to_string()),
                ("progress".to_string(), "0".to_string()),
                ("stage".to_string(), "starting".to_string()),
            ],
        )
        .await
    }

    /// Update progress and the stage label.
    pub async fn set_progress(&self, job_id: &JobId, progress: u8, stage: &str) -> QueueResult<()> {
        self.write_fields(
            job_id,
            vec![
                ("progress".to_string(), progress.min(100).to_string()),
                ("stage".to_string(), stage.to_string()),
            ],
        )
        .await
    }

    /// Terminal success write: status, full progress, and the object key.
    pub async fn mark_done(&self, job_id: &JobId, object_key: &str) -> QueueResult<()> {
        self.write_fields(
            job_id,
            vec![
                ("status".to_string(), JobStatus::Done.as_str().to_string()),
                ("progress".to_string(), "100".to_string()),
                ("stage".to_string(), "done".to_string()),
                ("object_key".to_string(), object_key.to_string()),
            ],
        )
        .await
    }

    /// Terminal failure write: status, code, truncated message.
    pub async fn mark_error(
        &self,
        job_id: &JobId,
        code: ErrorCode,
        message: &str,
    ) -> QueueResult<()> {
        self.write_fields(
            job_id,
            vec![
                ("status".to_string(), JobStatus::Error.as_str().to_string()),
                ("stage".to_string(), "error".to_string()),
                ("error_code".to_string(), code.as_str().to_string()),
                (
                    "error_message".to_string(),
                    JobRecord::truncate_message(message),
                ),
            ],
        )
        .await
    }

    /// Mark error only if the record is not already terminal.
    ///
    /// Used by the orphan reaper: the crashed owner may have managed a
    /// terminal write before dying, and terminal records never mutate again.
    /// Returns true when the error was written.
    pub async fn mark_error_if_active(
        &self,
        job_id: &JobId,
        code: ErrorCode,
        message: &str,
    ) -> QueueResult<bool> {
        if let Some(record) = self.read(job_id).await? {
            if record.is_terminal() {
                return Ok(false);
            }
        }
        self.mark_error(job_id, code, message).await?;
        Ok(true)
    }

    /// Read a job's record, if it exists.
    pub async fn read(&self, job_id: &JobId) -> QueueResult<Option<JobRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let fields: HashMap<String, String> = conn.hgetall(Self::record_key(job_id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(JobRecord::from_fields(&fields))
    }

    /// Current stage label of a job, if known. The reaper uses this to pick
    /// the error code matching the stage the job died in.
    pub async fn read_stage(&self, job_id: &JobId) -> QueueResult<Option<String>> {
        Ok(self.read(job_id).await?.map(|r| r.stage))
    }

    /// Write fields and refresh the retention TTL.
    async fn write_fields(
        &self,
        job_id: &JobId,
        fields: Vec<(String, String)>,
    ) -> QueueResult<()> {
        let key = Self::record_key(job_id);
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        conn.hset_multiple::<_, _, _, ()>(&key, &fields).await?;
        conn.expire::<_, ()>(&key, self.retention_secs).await?;

        debug!(job_id = %job_id, fields = fields.len(), "Wrote job record fields");
        Ok(())
    }
}

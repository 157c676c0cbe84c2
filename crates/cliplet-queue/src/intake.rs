//! Intake: validate a clip request, persist the queued record, enqueue.
//!
//! This is the boundary the HTTP layer calls. Validation happens here,
//! before anything is queued; a rejected request never produces a job.

use thiserror::Error;
use tracing::info;

use cliplet_models::{ErrorCode, IntakeLimits, ClipRequest, JobId, JobRecord, ValidationError};

use crate::error::QueueError;
use crate::job::ClipJob;
use crate::queue::JobQueue;
use crate::state::JobStateStore;

/// Reasons a submission was rejected or failed.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Queue is full")]
    QueueFull,

    #[error("Queue error: {0}")]
    Queue(QueueError),
}

impl IntakeError {
    /// Taxonomy code for this rejection, when one applies.
    ///
    /// Infrastructure failures have no taxonomy code; the caller surfaces
    /// them as retryable server errors instead of a job outcome.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            IntakeError::Validation(_) => Some(ErrorCode::ValidationFailed),
            IntakeError::QueueFull => Some(ErrorCode::QueueFull),
            IntakeError::Queue(_) => None,
        }
    }
}

impl From<QueueError> for IntakeError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::BacklogFull(_) => IntakeError::QueueFull,
            other => IntakeError::Queue(other),
        }
    }
}

/// Submit a clip request: validate, create the queued record, enqueue.
pub async fn submit_job(
    request: &ClipRequest,
    limits: &IntakeLimits,
    queue: &JobQueue,
    store: &JobStateStore,
) -> Result<JobId, IntakeError> {
    request.validate(limits)?;

    let job = ClipJob::from_request(request);
    let job_id = job.job_id.clone();

    // Record first, enqueue second: a poller must never observe a job id
    // that the store does not know.
    store.create_queued(&job_id).await?;
    queue.enqueue(&job).await?;

    info!(job_id = %job_id, url = %request.url, "Accepted clip job");
    Ok(job_id)
}

/// Read a job's status record.
pub async fn read_job(
    job_id: &JobId,
    store: &JobStateStore,
) -> Result<Option<JobRecord>, QueueError> {
    store.read(job_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intake_errors_map_to_taxonomy_codes() {
        let validation = IntakeError::Validation(ValidationError::InvalidRange);
        assert_eq!(validation.error_code(), Some(ErrorCode::ValidationFailed));

        let full = IntakeError::from(QueueError::BacklogFull(500));
        assert!(matches!(full, IntakeError::QueueFull));
        assert_eq!(full.error_code(), Some(ErrorCode::QueueFull));

        let infra = IntakeError::Queue(QueueError::connection_failed("redis down"));
        assert_eq!(infra.error_code(), None);
    }
}

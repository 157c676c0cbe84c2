//! Structured job logging utilities.

use cliplet_models::JobId;
use tracing::{error, info, warn};

/// Per-job logger with consistent structured fields.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
}

impl JobLogger {
    /// Create a logger for one job.
    pub fn new(job_id: &JobId) -> Self {
        Self {
            job_id: job_id.to_string(),
        }
    }

    /// Log a stage transition.
    pub fn stage(&self, stage: &str, message: &str) {
        info!(job_id = %self.job_id, stage = stage, "{}", message);
    }

    /// Log a warning during job execution.
    pub fn warning(&self, message: &str) {
        warn!(job_id = %self.job_id, "{}", message);
    }

    /// Log a terminal failure.
    pub fn failure(&self, code: &str, message: &str) {
        error!(job_id = %self.job_id, error_code = code, "{}", message);
    }

    /// Log terminal success.
    pub fn completion(&self, object_key: &str) {
        info!(job_id = %self.job_id, object_key = object_key, "Job completed");
    }

    /// Get the job ID.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_keeps_job_id() {
        let job_id = JobId::from_string("job-1");
        let logger = JobLogger::new(&job_id);
        assert_eq!(logger.job_id(), "job-1");
    }
}

//! Worker error types and their mapping onto the error-code taxonomy.

use thiserror::Error;

use cliplet_media::{DownloadFailureKind, MediaError};
use cliplet_models::ErrorCode;
use cliplet_queue::QueueError;
use cliplet_storage::StorageError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Download stage failed: {0}")]
    Download(MediaError),

    #[error("Trim stage failed: {0}")]
    Trim(MediaError),

    #[error("Upload stage failed: {0}")]
    Upload(StorageError),

    #[error("Job exceeded its wall-clock timeout in stage '{stage}'")]
    JobTimeout { stage: String },

    #[error("Queue operation failed: {0}")]
    Queue(#[from] QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Taxonomy code written to the job record for this failure.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            WorkerError::Download(media) => match media {
                MediaError::DownloadFailed { kind, .. } => match kind {
                    DownloadFailureKind::AuthRequired => ErrorCode::DownloadAuthRequired,
                    DownloadFailureKind::RateLimited => ErrorCode::DownloadRateLimited,
                    DownloadFailureKind::Unavailable => ErrorCode::DownloadUnavailable,
                    DownloadFailureKind::Timeout => ErrorCode::DownloadTimeout,
                    DownloadFailureKind::Unknown => ErrorCode::DownloadUnknown,
                },
                MediaError::Timeout(_) => ErrorCode::DownloadTimeout,
                _ => ErrorCode::DownloadUnknown,
            },
            WorkerError::Trim(_) => ErrorCode::TrimFailed,
            WorkerError::Upload(_) => ErrorCode::UploadFailed,
            WorkerError::JobTimeout { stage } => stage_failure_code(stage, true),
            WorkerError::Queue(_) | WorkerError::Io(_) => ErrorCode::DownloadUnknown,
        }
    }
}

/// Code for a job that died or timed out in a given stage.
///
/// Trim and upload have their own terminal codes regardless of how the stage
/// ended; anything earlier is a download-phase failure, reported as a
/// timeout when the wall clock expired and unknown when the worker vanished.
pub fn stage_failure_code(stage: &str, timed_out: bool) -> ErrorCode {
    match stage {
        "trimming" => ErrorCode::TrimFailed,
        "uploading" => ErrorCode::UploadFailed,
        _ if timed_out => ErrorCode::DownloadTimeout,
        _ => ErrorCode::DownloadUnknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_kinds_map_onto_taxonomy() {
        let cases = [
            (
                DownloadFailureKind::AuthRequired,
                ErrorCode::DownloadAuthRequired,
            ),
            (
                DownloadFailureKind::RateLimited,
                ErrorCode::DownloadRateLimited,
            ),
            (
                DownloadFailureKind::Unavailable,
                ErrorCode::DownloadUnavailable,
            ),
            (DownloadFailureKind::Timeout, ErrorCode::DownloadTimeout),
            (DownloadFailureKind::Unknown, ErrorCode::DownloadUnknown),
        ];

        for (kind, expected) in cases {
            let err = WorkerError::Download(MediaError::download_failed(kind, "x"));
            assert_eq!(err.error_code(), expected);
        }
    }

    #[test]
    fn trim_and_upload_are_terminal_codes() {
        let trim = WorkerError::Trim(MediaError::trim_failed("no video stream"));
        assert_eq!(trim.error_code(), ErrorCode::TrimFailed);

        let upload = WorkerError::Upload(StorageError::upload_failed("bucket gone"));
        assert_eq!(upload.error_code(), ErrorCode::UploadFailed);
    }

    #[test]
    fn stage_failure_codes() {
        assert_eq!(stage_failure_code("trimming", true), ErrorCode::TrimFailed);
        assert_eq!(stage_failure_code("uploading", false), ErrorCode::UploadFailed);
        assert_eq!(
            stage_failure_code("downloading", true),
            ErrorCode::DownloadTimeout
        );
        assert_eq!(
            stage_failure_code("downloading", false),
            ErrorCode::DownloadUnknown
        );
        assert_eq!(stage_failure_code("", true), ErrorCode::DownloadTimeout);
    }

    #[test]
    fn job_timeout_uses_stage_mapping() {
        let err = WorkerError::JobTimeout {
            stage: "trimming".to_string(),
        };
        assert_eq!(err.error_code(), ErrorCode::TrimFailed);

        let err = WorkerError::JobTimeout {
            stage: "downloading".to_string(),
        };
        assert_eq!(err.error_code(), ErrorCode::DownloadTimeout);
    }
}

//! Terminal error taxonomy for clip jobs.
//!
//! Every failed job carries exactly one of these codes in its status record.
//! The wire form is SCREAMING_SNAKE and must stay stable: pollers branch on
//! the literal strings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code reported on a job's status record when it ends in `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Extractor needs credentials the fallback chain could not provide
    DownloadAuthRequired,
    /// The remote platform throttled every extraction attempt
    DownloadRateLimited,
    /// Content is private, removed, region-locked or otherwise unreachable
    DownloadUnavailable,
    /// Every extraction attempt hit its time ceiling
    DownloadTimeout,
    /// Extraction failed for a reason we could not classify
    DownloadUnknown,
    /// The transcoder exited non-zero or produced no video stream
    TrimFailed,
    /// Object storage rejected the trimmed artifact
    UploadFailed,
    /// The request failed intake validation (bounds, ordering, URL shape)
    ValidationFailed,
    /// The queue backlog cap was reached at submission time
    QueueFull,
}

impl ErrorCode {
    /// All taxonomy members, in declaration order.
    pub const ALL: [ErrorCode; 9] = [
        ErrorCode::DownloadAuthRequired,
        ErrorCode::DownloadRateLimited,
        ErrorCode::DownloadUnavailable,
        ErrorCode::DownloadTimeout,
        ErrorCode::DownloadUnknown,
        ErrorCode::TrimFailed,
        ErrorCode::UploadFailed,
        ErrorCode::ValidationFailed,
        ErrorCode::QueueFull,
    ];

    /// Stable wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DownloadAuthRequired => "DOWNLOAD_AUTH_REQUIRED",
            ErrorCode::DownloadRateLimited => "DOWNLOAD_RATE_LIMITED",
            ErrorCode::DownloadUnavailable => "DOWNLOAD_UNAVAILABLE",
            ErrorCode::DownloadTimeout => "DOWNLOAD_TIMEOUT",
            ErrorCode::DownloadUnknown => "DOWNLOAD_UNKNOWN",
            ErrorCode::TrimFailed => "TRIM_FAILED",
            ErrorCode::UploadFailed => "UPLOAD_FAILED",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::QueueFull => "QUEUE_FULL",
        }
    }

    /// Parse the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_round_trip() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::parse(code.as_str()), Some(code));
        }
    }

    #[test]
    fn unknown_strings_are_rejected() {
        assert_eq!(ErrorCode::parse("SOMETHING_ELSE"), None);
        assert_eq!(ErrorCode::parse("download_timeout"), None);
    }

    #[test]
    fn serde_matches_as_str() {
        for code in ErrorCode::ALL {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }
}

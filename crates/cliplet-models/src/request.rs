//! Clip request and intake validation.
//!
//! Validation runs before a job is queued: a request that fails here never
//! reaches the pipeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A request to cut one clip from a source URL.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClipRequest {
    /// Source media URL
    pub url: String,
    /// Clip start offset in seconds
    pub start_seconds: f64,
    /// Clip end offset in seconds (must be > start)
    pub end_seconds: f64,
    /// Explicit extractor format identifier; overrides resolution mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_id: Option<String>,
    /// Target resolution label (e.g. "720p")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl ClipRequest {
    /// Requested clip duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// Validate the request against intake limits.
    pub fn validate(&self, limits: &IntakeLimits) -> Result<(), ValidationError> {
        let parsed = url::Url::parse(self.url.trim())
            .map_err(|_| ValidationError::InvalidUrl(self.url.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidUrl(self.url.clone()));
        }

        if !self.start_seconds.is_finite() || !self.end_seconds.is_finite() {
            return Err(ValidationError::InvalidRange);
        }
        if self.start_seconds < 0.0 {
            return Err(ValidationError::NegativeStart(self.start_seconds));
        }
        if self.end_seconds <= self.start_seconds {
            return Err(ValidationError::InvalidRange);
        }

        let duration = self.duration();
        if duration > limits.max_clip_seconds {
            return Err(ValidationError::ClipTooLong {
                requested: duration,
                max: limits.max_clip_seconds,
            });
        }

        Ok(())
    }
}

/// Limits enforced at intake, before queuing.
#[derive(Debug, Clone)]
pub struct IntakeLimits {
    /// Maximum allowed clip duration (end - start) in seconds
    pub max_clip_seconds: f64,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_clip_seconds: 600.0,
        }
    }
}

impl IntakeLimits {
    /// Create limits from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_clip_seconds: std::env::var("CLIPLET_MAX_CLIP_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(600.0),
        }
    }
}

/// Reasons a clip request is rejected at intake.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Not a usable http(s) URL: {0}")]
    InvalidUrl(String),

    #[error("End offset must be greater than start offset")]
    InvalidRange,

    #[error("Start offset must not be negative (got {0})")]
    NegativeStart(f64),

    #[error("Requested clip is {requested:.1}s, maximum is {max:.1}s")]
    ClipTooLong { requested: f64, max: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: f64, end: f64) -> ClipRequest {
        ClipRequest {
            url: "https://youtube.com/watch?v=abc123def45".to_string(),
            start_seconds: start,
            end_seconds: end,
            format_id: None,
            resolution: None,
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request(10.0, 70.0).validate(&IntakeLimits::default()).is_ok());
    }

    #[test]
    fn end_before_start_is_rejected() {
        let err = request(70.0, 10.0)
            .validate(&IntakeLimits::default())
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidRange);
    }

    #[test]
    fn end_equal_to_start_is_rejected() {
        let err = request(30.0, 30.0)
            .validate(&IntakeLimits::default())
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidRange);
    }

    #[test]
    fn over_long_clip_is_rejected() {
        let limits = IntakeLimits {
            max_clip_seconds: 60.0,
        };
        let err = request(0.0, 120.0).validate(&limits).unwrap_err();
        assert!(matches!(err, ValidationError::ClipTooLong { .. }));
    }

    #[test]
    fn negative_start_is_rejected() {
        let err = request(-5.0, 10.0)
            .validate(&IntakeLimits::default())
            .unwrap_err();
        assert!(matches!(err, ValidationError::NegativeStart(_)));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let mut req = request(0.0, 10.0);
        req.url = "ftp://example.com/video".to_string();
        assert!(matches!(
            req.validate(&IntakeLimits::default()),
            Err(ValidationError::InvalidUrl(_))
        ));

        req.url = "not a url".to_string();
        assert!(matches!(
            req.validate(&IntakeLimits::default()),
            Err(ValidationError::InvalidUrl(_))
        ));
    }
}

//! Shared data models for the Cliplet backend.
//!
//! This crate provides Serde-serializable types for:
//! - Job identity and the polled job status record
//! - Clip requests and intake validation
//! - The fixed error-code taxonomy
//! - Platform classification and format-selector resolution

pub mod error_code;
pub mod job;
pub mod platform;
pub mod record;
pub mod request;

// Re-export common types
pub use error_code::ErrorCode;
pub use job::JobId;
pub use platform::{resolve_format, resolve_platform, Platform};
pub use record::{JobRecord, JobStatus, ERROR_MESSAGE_MAX_LEN};
pub use request::{ClipRequest, IntakeLimits, ValidationError};

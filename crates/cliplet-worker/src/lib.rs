//! Clip pipeline worker.
//!
//! This crate provides:
//! - The pipeline orchestrator driving one job through
//!   download, then rotation analysis, then trim, then upload
//! - The executor: a fixed-width worker pool with per-job timeouts,
//!   orphan reaping, and graceful shutdown
//! - Structured per-job logging

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{stage_failure_code, WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use pipeline::{process_clip_job, PipelineContext};

//! Redis-backed job queue and job state store.
//!
//! This crate provides:
//! - Job enqueueing via Redis Streams, with a backlog cap
//! - Worker consumption with consumer groups and orphan claiming
//! - The per-job status record store (one Redis hash per job)
//! - The intake functions bridging clip requests into the pipeline

pub mod error;
pub mod intake;
pub mod job;
pub mod queue;
pub mod state;

pub use error::{QueueError, QueueResult};
pub use intake::{read_job, submit_job, IntakeError};
pub use job::ClipJob;
pub use queue::{JobQueue, QueueConfig};
pub use state::{JobStateStore, StateStoreConfig};

//! Object storage for finished clips.
//!
//! This crate provides:
//! - An S3-compatible (Cloudflare R2) client
//! - Deterministic clip keys and attachment filenames
//! - Time-bounded presigned access references

pub mod client;
pub mod error;
pub mod keys;

pub use client::{content_type_for, R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use keys::{attachment_disposition, attachment_filename, clip_object_key};

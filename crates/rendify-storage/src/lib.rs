//! S3 object storage client.
//!
//! This crate provides:
//! - Source download to the per-job scratch directory
//! - Rendition upload to the deterministic output key (always overwritable)

pub mod client;
pub mod error;

pub use client::{StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};

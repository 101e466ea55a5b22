//! Transcode worker.
//!
//! This crate provides:
//! - The sequential queue consumer loop
//! - The per-message processing pipeline (idempotency guard, state
//!   transitions, encode, result materialization)
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use processor::Processor;

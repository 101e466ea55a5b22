//! Shared data models for the Rendify transcode pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Job records and status transitions
//! - Queue message payloads
//! - Encode presets and encoder intensity profiles

pub mod job;
pub mod message;
pub mod preset;

pub use job::{Job, JobId, JobStatus, JobUpdate};
pub use message::TranscodeMessage;
pub use preset::{resolve_preset, Intensity, PresetSpec, DEFAULT_PRESET};

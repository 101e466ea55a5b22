//! FFmpeg transcode invocation.
//!
//! This crate provides:
//! - An FFmpeg command builder
//! - A blocking-from-the-caller's-perspective runner with captured diagnostics
//! - The preset/intensity transcode entry point used by the worker

pub mod command;
pub mod error;
pub mod transcode;

pub use command::{check_ffmpeg, FfmpegCommand};
pub use error::{MediaError, MediaResult};
pub use transcode::transcode;

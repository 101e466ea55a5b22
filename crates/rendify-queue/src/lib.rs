//! SQS job queue consumer.
//!
//! This crate provides:
//! - Single-message long-poll receive with a configurable visibility ceiling
//! - Message deletion and visibility extension by receipt handle
//! - A background lease extender scoped to one in-flight message

pub mod error;
pub mod lease;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use lease::{LeaseExtender, LeaseKeeper};
pub use queue::{JobQueue, QueueConfig, ReceivedMessage};

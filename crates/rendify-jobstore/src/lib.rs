//! DynamoDB-backed job state store.
//!
//! This crate provides:
//! - Job record reads and initial PENDING writes
//! - Conditional field-set updates that can never mutate a DONE record

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{JobStore, JobStoreConfig};

//! # Registry
//!
//! Live, process-local state for promotion runs.
//!
//! - [`job`] - `PromotionJob`, the progress mirror of one batch run
//! - [`job_store`] - `JobStore` seam and its `DashMap` implementation
//! - [`job_registry`] - Lookup, single-slot progress subscribers and cleanup

pub mod job;
pub mod job_registry;
pub mod job_store;

pub use job::{PromotionJob, SharedJob};
pub use job_registry::{JobRegistry, ProgressCallback};
pub use job_store::{InMemoryJobStore, JobStore};

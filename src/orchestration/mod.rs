//! # Orchestration
//!
//! The promotion batch run and the pieces it is assembled from.
//!
//! ## Core Components
//!
//! - **PromotionProcessor**: Loads a batch, launches its run and applies each
//!   record in its own transaction while publishing progress
//! - **Failure classification**: Maps a failed record's error to an
//!   operator-facing reason
//! - **TaskLauncher**: Detaches runs from the caller and hands back a
//!   joinable, abortable handle

pub mod error_classifier;
pub mod promotion_processor;
pub mod task_launcher;

pub use error_classifier::{classify_failure, FailureContext, FailureReason};
pub use promotion_processor::{ProcessorSettings, PromotionProcessor};
pub use task_launcher::{JobHandle, TaskLauncher, TokioTaskLauncher};

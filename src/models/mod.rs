//! # Data Models
//!
//! Rows the promotion core reads and mutates. Batches and records are owned by
//! the promotion flow; students and classes are touched only as side effects.

pub mod class;
pub mod promotion_batch;
pub mod promotion_record;
pub mod student;

pub use class::Class;
pub use promotion_batch::{BatchUpdate, PromotionBatch, PromotionBatchDetail};
pub use promotion_record::{PromotionRecord, PromotionRecordDetail, RecordUpdate};
pub use student::{Student, StudentUpdate};

//! # Promotion Record Model
//!
//! One student's precomputed decision within a batch. Maps to the
//! `promotion_records` table.

use super::class::Class;
use super::student::Student;
use crate::state_machine::{PromotionType, RecordStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionRecord {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub student_id: Uuid,
    pub from_class_id: Uuid,
    /// Required for `PROMOTED`, absent otherwise
    pub to_class_id: Option<Uuid>,
    pub promotion_type: PromotionType,
    pub status: RecordStatus,
    pub processed_at: Option<DateTime<Utc>>,
}

impl PromotionRecord {
    pub fn new(
        batch_id: Uuid,
        student_id: Uuid,
        from_class_id: Uuid,
        to_class_id: Option<Uuid>,
        promotion_type: PromotionType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_id,
            student_id,
            from_class_id,
            to_class_id,
            promotion_type,
            status: RecordStatus::Pending,
            processed_at: None,
        }
    }
}

/// A record with the rows the processor needs to act on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionRecordDetail {
    pub record: PromotionRecord,
    pub student: Student,
    pub from_class: Class,
    pub to_class: Option<Class>,
}

/// Status move for a record; `processed_at` is only set when `Some`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUpdate {
    pub status: RecordStatus,
    pub processed_at: Option<DateTime<Utc>>,
}

impl RecordUpdate {
    pub fn in_progress(at: DateTime<Utc>) -> Self {
        Self {
            status: RecordStatus::InProgress,
            processed_at: Some(at),
        }
    }

    pub fn completed() -> Self {
        Self {
            status: RecordStatus::Completed,
            processed_at: None,
        }
    }
}

//! # Promotion Batch Model
//!
//! One administrative run promoting, retaining or graduating a cohort.
//!
//! Maps to the `promotion_batches` table. Batches are created elsewhere in
//! `PENDING` with their records already decided; the promotion core moves them
//! to `IN_PROGRESS` and then to `COMPLETED` or `FAILED`.
//!
//! Only the three success counters are persisted. Failures live in the
//! in-memory job and the audit trail.

use super::promotion_record::PromotionRecordDetail;
use crate::state_machine::BatchStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionBatch {
    pub id: Uuid,
    pub name: String,
    pub academic_year: String,
    pub status: BatchStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub promoted_students: i32,
    pub retained_students: i32,
    pub graduated_students: i32,
    pub created_by: Uuid,
}

impl PromotionBatch {
    pub fn new(name: impl Into<String>, academic_year: impl Into<String>, created_by: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            academic_year: academic_year.into(),
            status: BatchStatus::Pending,
            started_at: None,
            completed_at: None,
            promoted_students: 0,
            retained_students: 0,
            graduated_students: 0,
            created_by,
        }
    }

    /// Apply a partial update in memory, mirroring the SQL `COALESCE` update
    pub fn apply(&mut self, update: &BatchUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(started_at) = update.started_at {
            self.started_at = Some(started_at);
        }
        if let Some(completed_at) = update.completed_at {
            self.completed_at = Some(completed_at);
        }
        if let Some(promoted) = update.promoted_students {
            self.promoted_students = promoted;
        }
        if let Some(retained) = update.retained_students {
            self.retained_students = retained;
        }
        if let Some(graduated) = update.graduated_students {
            self.graduated_students = graduated;
        }
    }
}

/// A batch with its records and their students and classes eagerly loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionBatchDetail {
    pub batch: PromotionBatch,
    pub records: Vec<PromotionRecordDetail>,
}

/// Partial batch update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchUpdate {
    pub status: Option<BatchStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub promoted_students: Option<i32>,
    pub retained_students: Option<i32>,
    pub graduated_students: Option<i32>,
}

impl BatchUpdate {
    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(BatchStatus::InProgress),
            started_at: Some(at),
            ..Default::default()
        }
    }

    pub fn finished(
        status: BatchStatus,
        at: DateTime<Utc>,
        promoted: i32,
        retained: i32,
        graduated: i32,
    ) -> Self {
        Self {
            status: Some(status),
            completed_at: Some(at),
            promoted_students: Some(promoted),
            retained_students: Some(retained),
            graduated_students: Some(graduated),
            ..Default::default()
        }
    }

    pub fn failed(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(BatchStatus::Failed),
            completed_at: Some(at),
            ..Default::default()
        }
    }
}

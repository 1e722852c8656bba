//! # Promotion Job
//!
//! The in-memory, non-persisted progress mirror of one batch run.

use crate::state_machine::{JobStatus, PromotionType};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A job shared between the processing loop (writer) and progress readers
pub type SharedJob = Arc<RwLock<PromotionJob>>;

/// Live progress of a batch run.
///
/// Outcome counters and `processed_students` are always moved together, so
/// `processed_students` equals the sum of the four outcome counters in every
/// snapshot a reader can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionJob {
    pub batch_id: Uuid,
    pub user_id: Uuid,
    pub total_students: usize,
    pub processed_students: usize,
    pub promoted_students: usize,
    pub retained_students: usize,
    pub graduated_students: usize,
    pub failed_students: usize,
    pub status: JobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub errors: Vec<String>,
}

impl PromotionJob {
    pub fn new(batch_id: Uuid, user_id: Uuid, total_students: usize) -> Self {
        Self {
            batch_id,
            user_id,
            total_students,
            processed_students: 0,
            promoted_students: 0,
            retained_students: 0,
            graduated_students: 0,
            failed_students: 0,
            status: JobStatus::Pending,
            started_at: None,
            completed_at: None,
            errors: Vec::new(),
        }
    }

    pub fn into_shared(self) -> SharedJob {
        Arc::new(RwLock::new(self))
    }

    pub fn mark_started(&mut self, at: DateTime<Utc>) {
        self.status = JobStatus::InProgress;
        self.started_at = Some(at);
    }

    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(at);
    }

    /// Abort the run; `message` is appended to the error list
    pub fn mark_failed(&mut self, at: DateTime<Utc>, message: String) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(at);
        self.errors.push(message);
    }

    pub fn record_success(&mut self, promotion_type: PromotionType) {
        match promotion_type {
            PromotionType::Promoted => self.promoted_students += 1,
            PromotionType::Retained => self.retained_students += 1,
            PromotionType::Graduated => self.graduated_students += 1,
        }
        self.processed_students += 1;
    }

    pub fn record_failure(&mut self, message: String) {
        self.failed_students += 1;
        self.errors.push(message);
        self.processed_students += 1;
    }

    pub fn counters_balanced(&self) -> bool {
        self.processed_students
            == self.promoted_students
                + self.retained_students
                + self.graduated_students
                + self.failed_students
    }

    pub fn completion_percentage(&self) -> f64 {
        if self.total_students == 0 {
            return 100.0;
        }
        (self.processed_students as f64 / self.total_students as f64) * 100.0
    }

    /// Terminal and finished longer than `retention` before `now`. A window
    /// reaching past the earliest representable time never expires.
    pub fn is_expired(&self, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return false;
        };
        self.status.is_terminal()
            && self
                .completed_at
                .is_some_and(|completed_at| completed_at < cutoff)
    }
}

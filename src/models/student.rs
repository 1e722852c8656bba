//! # Student Model
//!
//! Maps to the `students` table.

use crate::state_machine::AcademicStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Unique within a class
    pub roll_number: Option<String>,
    pub class_id: Option<Uuid>,
    pub academic_status: AcademicStatus,
}

impl Student {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, class_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            roll_number: None,
            class_id: Some(class_id),
            academic_status: AcademicStatus::Active,
        }
    }

    pub fn with_roll_number(mut self, roll_number: impl Into<String>) -> Self {
        self.roll_number = Some(roll_number.into());
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Partial update applied to a student inside a promotion transaction.
/// `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentUpdate {
    pub class_id: Option<Uuid>,
    pub academic_status: Option<AcademicStatus>,
}

impl StudentUpdate {
    pub fn moved_to(class_id: Uuid) -> Self {
        Self {
            class_id: Some(class_id),
            academic_status: Some(AcademicStatus::Active),
        }
    }

    pub fn graduated() -> Self {
        Self {
            class_id: None,
            academic_status: Some(AcademicStatus::Graduated),
        }
    }
}

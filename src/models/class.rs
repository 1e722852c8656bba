//! # Class Model
//!
//! Maps to the `classes` table. `current_enrollment` moves by one per
//! promotion or graduation and is bounded by `capacity` when one is set.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: Uuid,
    pub name: String,
    pub grade: i32,
    pub capacity: Option<i32>,
    pub current_enrollment: i32,
}

impl Class {
    pub fn new(name: impl Into<String>, grade: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            grade,
            capacity: None,
            current_enrollment: 0,
        }
    }

    pub fn with_capacity(mut self, capacity: i32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_enrollment(mut self, enrollment: i32) -> Self {
        self.current_enrollment = enrollment;
        self
    }

    /// Whether `delta` more students would still fit
    pub fn can_accept(&self, delta: i32) -> bool {
        match self.capacity {
            Some(capacity) => self.current_enrollment + delta <= capacity,
            None => true,
        }
    }
}

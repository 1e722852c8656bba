//! Fixture builders over the in-memory gateway.

#![allow(dead_code)]

use promotion_core::audit::{AuditRecorder, InMemoryAuditRecorder};
use promotion_core::config::DuplicateStartPolicy;
use promotion_core::database::InMemoryGateway;
use promotion_core::models::{Class, PromotionBatch, PromotionRecord, Student};
use promotion_core::orchestration::{ProcessorSettings, PromotionProcessor};
use promotion_core::registry::{JobRegistry, PromotionJob};
use promotion_core::state_machine::PromotionType;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Settings with throttling switched off so runs finish without sleeping
pub fn unthrottled_settings() -> ProcessorSettings {
    ProcessorSettings {
        throttle_every: 10,
        throttle_delay: Duration::ZERO,
        final_grade: 12,
        duplicate_start_policy: DuplicateStartPolicy::Overwrite,
    }
}

/// A school with an in-memory gateway, audit recorder and job registry
pub struct SchoolFixture {
    pub gateway: InMemoryGateway,
    pub audit: InMemoryAuditRecorder,
    pub registry: JobRegistry,
    pub admin_id: Uuid,
}

impl Default for SchoolFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl SchoolFixture {
    pub fn new() -> Self {
        Self::with_audit(InMemoryAuditRecorder::new())
    }

    pub fn with_audit(audit: InMemoryAuditRecorder) -> Self {
        Self {
            gateway: InMemoryGateway::new(),
            audit,
            registry: JobRegistry::in_memory(chrono::Duration::hours(24)),
            admin_id: Uuid::new_v4(),
        }
    }

    pub fn class(&self, name: &str, grade: i32, enrollment: i32) -> Uuid {
        self.gateway
            .insert_class(Class::new(name, grade).with_enrollment(enrollment))
    }

    pub fn class_with_capacity(&self, name: &str, grade: i32, enrollment: i32, capacity: i32) -> Uuid {
        self.gateway.insert_class(
            Class::new(name, grade)
                .with_enrollment(enrollment)
                .with_capacity(capacity),
        )
    }

    pub fn student(&self, first_name: &str, last_name: &str, class_id: Uuid) -> Uuid {
        self.gateway
            .insert_student(Student::new(first_name, last_name, class_id))
    }

    pub fn batch(&self, name: &str) -> Uuid {
        self.gateway
            .insert_batch(PromotionBatch::new(name, "2024-2025", self.admin_id))
    }

    pub fn record(
        &self,
        batch_id: Uuid,
        student_id: Uuid,
        from_class_id: Uuid,
        to_class_id: Option<Uuid>,
        promotion_type: PromotionType,
    ) -> Uuid {
        self.gateway.insert_record(PromotionRecord::new(
            batch_id,
            student_id,
            from_class_id,
            to_class_id,
            promotion_type,
        ))
    }

    /// A batch of `count` students retained in one class
    pub fn retained_batch(&self, count: usize) -> Uuid {
        let class_id = self.class("Grade 4", 4, i32::try_from(count).unwrap_or(i32::MAX));
        let batch_id = self.batch("Retention batch");
        for i in 0..count {
            let student_id = self.student(&format!("Student{i}"), "Retained", class_id);
            self.record(batch_id, student_id, class_id, None, PromotionType::Retained);
        }
        batch_id
    }

    pub fn processor(&self) -> PromotionProcessor {
        self.processor_with(unthrottled_settings())
    }

    pub fn processor_with(&self, settings: ProcessorSettings) -> PromotionProcessor {
        let audit: Arc<dyn AuditRecorder> = Arc::new(self.audit.clone());
        PromotionProcessor::new(
            Arc::new(self.gateway.clone()),
            audit,
            self.registry.clone(),
            settings,
        )
    }

    /// Start a job, wait for the run to end and return the final job state
    pub async fn run_to_completion(&self, processor: &PromotionProcessor, batch_id: Uuid) -> PromotionJob {
        let handle = processor
            .start_promotion_job(batch_id, self.admin_id)
            .await
            .expect("job should start");
        handle.join().await.expect("run should not panic");
        processor
            .get_job_progress(batch_id)
            .expect("job should stay registered")
    }
}

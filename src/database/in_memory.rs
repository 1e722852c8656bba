//! # In-Memory Gateway
//!
//! A [`PromotionGateway`] backed by mutex-guarded tables. It enforces the same
//! rules the Postgres schema does (foreign keys, the per-class roll number
//! uniqueness, capacity and non-negative enrollment) and raises the same
//! tagged errors.
//!
//! Transactions stage their writes. Each write is validated against the
//! committed tables plus everything staged before it, and commit re-applies the
//! staged writes to a copy of the tables before swapping it in, so a commit
//! either lands completely or not at all.

use super::errors::{GatewayError, GatewayResult};
use super::gateway::{GatewayTransaction, PromotionGateway};
use crate::models::{
    BatchUpdate, Class, PromotionBatch, PromotionBatchDetail, PromotionRecord,
    PromotionRecordDetail, RecordUpdate, Student, StudentUpdate,
};
use crate::state_machine::AcademicStatus;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Tables {
    batches: HashMap<Uuid, PromotionBatch>,
    records: HashMap<Uuid, PromotionRecord>,
    /// Insertion order of records, which is the load order
    record_order: Vec<Uuid>,
    students: HashMap<Uuid, Student>,
    classes: HashMap<Uuid, Class>,
}

#[derive(Debug, Clone)]
enum StagedWrite {
    Record(Uuid, RecordUpdate),
    Student(Uuid, StudentUpdate),
    Enrollment(Uuid, i32),
}

impl Tables {
    fn apply(&mut self, write: &StagedWrite) -> GatewayResult<()> {
        match write {
            StagedWrite::Record(record_id, update) => {
                let record = self
                    .records
                    .get_mut(record_id)
                    .ok_or_else(|| GatewayError::not_found("promotion_record"))?;
                record.status = update.status;
                if let Some(processed_at) = update.processed_at {
                    record.processed_at = Some(processed_at);
                }
            }
            StagedWrite::Student(student_id, update) => {
                let student = self
                    .students
                    .get(student_id)
                    .ok_or_else(|| GatewayError::not_found("student"))?;

                if let Some(class_id) = update.class_id {
                    if !self.classes.contains_key(&class_id) {
                        return Err(GatewayError::ForeignKeyViolation {
                            field: "class_id".to_string(),
                        });
                    }
                    if let Some(roll_number) = &student.roll_number {
                        let taken = self.students.values().any(|other| {
                            other.id != student.id
                                && other.class_id == Some(class_id)
                                && other.roll_number.as_ref() == Some(roll_number)
                        });
                        if taken {
                            return Err(GatewayError::UniqueViolation {
                                field: "roll_number".to_string(),
                            });
                        }
                    }
                }

                let student = self
                    .students
                    .get_mut(student_id)
                    .ok_or_else(|| GatewayError::not_found("student"))?;
                if let Some(class_id) = update.class_id {
                    student.class_id = Some(class_id);
                }
                if let Some(status) = update.academic_status {
                    student.academic_status = status;
                }
            }
            StagedWrite::Enrollment(class_id, delta) => {
                let class = self
                    .classes
                    .get_mut(class_id)
                    .ok_or_else(|| GatewayError::not_found("class"))?;
                if !class.can_accept(*delta) {
                    return Err(GatewayError::CapacityExceeded {
                        class_id: Some(*class_id),
                    });
                }
                let next = class.current_enrollment + delta;
                if next < 0 {
                    return Err(GatewayError::Database(format!(
                        "check constraint \"classes_enrollment_non_negative\" violated for class {class_id}"
                    )));
                }
                class.current_enrollment = next;
            }
        }
        Ok(())
    }

    /// `None` when the student or source class row is gone, matching the
    /// inner joins of the Postgres loader
    fn detail_for(&self, record: &PromotionRecord) -> Option<PromotionRecordDetail> {
        let student = self.students.get(&record.student_id).cloned()?;
        let from_class = self.classes.get(&record.from_class_id).cloned()?;
        let to_class = record
            .to_class_id
            .and_then(|id| self.classes.get(&id).cloned());

        Some(PromotionRecordDetail {
            record: record.clone(),
            student,
            from_class,
            to_class,
        })
    }
}

/// Shared in-memory store; clones share the same tables
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    tables: Arc<Mutex<Tables>>,
    batch_update_failures: Arc<Mutex<Vec<GatewayError>>>,
    commits: Arc<AtomicUsize>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_class(&self, class: Class) -> Uuid {
        let id = class.id;
        self.tables.lock().classes.insert(id, class);
        id
    }

    pub fn insert_student(&self, student: Student) -> Uuid {
        let id = student.id;
        self.tables.lock().students.insert(id, student);
        id
    }

    pub fn insert_batch(&self, batch: PromotionBatch) -> Uuid {
        let id = batch.id;
        self.tables.lock().batches.insert(id, batch);
        id
    }

    pub fn insert_record(&self, record: PromotionRecord) -> Uuid {
        let id = record.id;
        let mut tables = self.tables.lock();
        tables.record_order.push(id);
        tables.records.insert(id, record);
        id
    }

    pub fn class(&self, id: Uuid) -> Option<Class> {
        self.tables.lock().classes.get(&id).cloned()
    }

    pub fn student(&self, id: Uuid) -> Option<Student> {
        self.tables.lock().students.get(&id).cloned()
    }

    pub fn batch(&self, id: Uuid) -> Option<PromotionBatch> {
        self.tables.lock().batches.get(&id).cloned()
    }

    pub fn record(&self, id: Uuid) -> Option<PromotionRecord> {
        self.tables.lock().records.get(&id).cloned()
    }

    /// Remove a class without touching the rows that reference it
    pub fn remove_class(&self, id: Uuid) -> Option<Class> {
        self.tables.lock().classes.remove(&id)
    }

    /// Number of transactions committed so far
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Make the next `update_batch` call fail with `error`. Queued failures
    /// are consumed in order.
    pub fn fail_next_batch_update(&self, error: GatewayError) {
        self.batch_update_failures.lock().push(error);
    }

    pub fn students_with_status(&self, status: AcademicStatus) -> usize {
        self.tables
            .lock()
            .students
            .values()
            .filter(|student| student.academic_status == status)
            .count()
    }
}

#[async_trait]
impl PromotionGateway for InMemoryGateway {
    async fn find_batch_with_records(
        &self,
        batch_id: Uuid,
    ) -> GatewayResult<Option<PromotionBatchDetail>> {
        let tables = self.tables.lock();
        let Some(batch) = tables.batches.get(&batch_id).cloned() else {
            return Ok(None);
        };

        let records = tables
            .record_order
            .iter()
            .filter_map(|id| tables.records.get(id))
            .filter(|record| record.batch_id == batch_id)
            .filter_map(|record| {
                let detail = tables.detail_for(record);
                if detail.is_none() {
                    warn!(
                        batch_id = %batch_id,
                        record_id = %record.id,
                        "Skipping promotion record whose student or class is missing"
                    );
                }
                detail
            })
            .collect::<Vec<_>>();

        Ok(Some(PromotionBatchDetail { batch, records }))
    }

    async fn update_batch(&self, batch_id: Uuid, update: BatchUpdate) -> GatewayResult<()> {
        {
            let mut failures = self.batch_update_failures.lock();
            if !failures.is_empty() {
                return Err(failures.remove(0));
            }
        }

        let mut tables = self.tables.lock();
        let batch = tables
            .batches
            .get_mut(&batch_id)
            .ok_or_else(|| GatewayError::not_found("promotion_batch"))?;
        batch.apply(&update);
        Ok(())
    }

    async fn begin(&self) -> GatewayResult<Box<dyn GatewayTransaction>> {
        Ok(Box::new(InMemoryTransaction {
            tables: Arc::clone(&self.tables),
            commits: Arc::clone(&self.commits),
            staged: Vec::new(),
        }))
    }
}

pub struct InMemoryTransaction {
    tables: Arc<Mutex<Tables>>,
    commits: Arc<AtomicUsize>,
    staged: Vec<StagedWrite>,
}

impl InMemoryTransaction {
    fn stage(&mut self, write: StagedWrite) -> GatewayResult<()> {
        let mut scratch = self.tables.lock().clone();
        for staged in &self.staged {
            scratch.apply(staged)?;
        }
        scratch.apply(&write)?;
        self.staged.push(write);
        Ok(())
    }
}

#[async_trait]
impl GatewayTransaction for InMemoryTransaction {
    async fn update_record(&mut self, record_id: Uuid, update: RecordUpdate) -> GatewayResult<()> {
        self.stage(StagedWrite::Record(record_id, update))
    }

    async fn update_student(
        &mut self,
        student_id: Uuid,
        update: StudentUpdate,
    ) -> GatewayResult<()> {
        self.stage(StagedWrite::Student(student_id, update))
    }

    async fn update_class_enrollment(&mut self, class_id: Uuid, delta: i32) -> GatewayResult<()> {
        self.stage(StagedWrite::Enrollment(class_id, delta))
    }

    async fn commit(self: Box<Self>) -> GatewayResult<()> {
        let mut tables = self.tables.lock();
        let mut next = tables.clone();
        for write in &self.staged {
            next.apply(write)?;
        }
        *tables = next;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{PromotionType, RecordStatus};
    use chrono::Utc;

    struct Fixture {
        gateway: InMemoryGateway,
        from_class: Uuid,
        to_class: Uuid,
        student: Uuid,
        record: Uuid,
    }

    fn fixture(to_capacity: Option<i32>) -> Fixture {
        let gateway = InMemoryGateway::new();
        let from_class = gateway.insert_class(Class::new("Grade 5", 5).with_enrollment(30));
        let mut to = Class::new("Grade 6", 6).with_enrollment(20);
        to.capacity = to_capacity;
        let to_class = gateway.insert_class(to);
        let student = gateway.insert_student(Student::new("Grace", "Hopper", from_class));
        let batch = gateway.insert_batch(PromotionBatch::new("Batch", "2024-2025", Uuid::new_v4()));
        let record = gateway.insert_record(PromotionRecord::new(
            batch,
            student,
            from_class,
            Some(to_class),
            PromotionType::Promoted,
        ));
        Fixture {
            gateway,
            from_class,
            to_class,
            student,
            record,
        }
    }

    #[tokio::test]
    async fn test_commit_applies_all_writes() {
        let f = fixture(None);
        let mut tx = f.gateway.begin().await.unwrap();
        tx.update_record(f.record, RecordUpdate::in_progress(Utc::now()))
            .await
            .unwrap();
        tx.update_student(f.student, StudentUpdate::moved_to(f.to_class))
            .await
            .unwrap();
        tx.update_class_enrollment(f.from_class, -1).await.unwrap();
        tx.update_class_enrollment(f.to_class, 1).await.unwrap();
        tx.update_record(f.record, RecordUpdate::completed())
            .await
            .unwrap();

        // Nothing visible before commit
        assert_eq!(f.gateway.class(f.from_class).unwrap().current_enrollment, 30);

        tx.commit().await.unwrap();

        assert_eq!(f.gateway.class(f.from_class).unwrap().current_enrollment, 29);
        assert_eq!(f.gateway.class(f.to_class).unwrap().current_enrollment, 21);
        assert_eq!(f.gateway.student(f.student).unwrap().class_id, Some(f.to_class));
        let record = f.gateway.record(f.record).unwrap();
        assert_eq!(record.status, RecordStatus::Completed);
        assert!(record.processed_at.is_some());
        assert_eq!(f.gateway.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let f = fixture(Some(20));
        let mut tx = f.gateway.begin().await.unwrap();
        tx.update_record(f.record, RecordUpdate::in_progress(Utc::now()))
            .await
            .unwrap();
        tx.update_class_enrollment(f.from_class, -1).await.unwrap();

        let error = tx.update_class_enrollment(f.to_class, 1).await.unwrap_err();
        assert_eq!(
            error,
            GatewayError::CapacityExceeded {
                class_id: Some(f.to_class)
            }
        );
        drop(tx);

        assert_eq!(f.gateway.class(f.from_class).unwrap().current_enrollment, 30);
        assert_eq!(f.gateway.record(f.record).unwrap().status, RecordStatus::Pending);
        assert_eq!(f.gateway.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_moving_to_missing_class_is_foreign_key_violation() {
        let f = fixture(None);
        let mut tx = f.gateway.begin().await.unwrap();
        let error = tx
            .update_student(f.student, StudentUpdate::moved_to(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(
            error,
            GatewayError::ForeignKeyViolation {
                field: "class_id".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_roll_number_unique_within_class() {
        let f = fixture(None);
        f.gateway.insert_student(
            Student::new("Existing", "Student", f.to_class).with_roll_number("7"),
        );
        let mover = f.gateway.insert_student(
            Student::new("Moving", "Student", f.from_class).with_roll_number("7"),
        );

        let mut tx = f.gateway.begin().await.unwrap();
        let error = tx
            .update_student(mover, StudentUpdate::moved_to(f.to_class))
            .await
            .unwrap_err();
        assert!(matches!(error, GatewayError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_enrollment_cannot_go_negative() {
        let gateway = InMemoryGateway::new();
        let class = gateway.insert_class(Class::new("Empty", 3));
        let mut tx = gateway.begin().await.unwrap();
        let error = tx.update_class_enrollment(class, -1).await.unwrap_err();
        assert!(matches!(error, GatewayError::Database(_)));
    }

    #[tokio::test]
    async fn test_queued_batch_update_failure_is_consumed_once() {
        let f = fixture(None);
        let batch_id = f.gateway.record(f.record).unwrap().batch_id;
        f.gateway
            .fail_next_batch_update(GatewayError::Database("connection reset".to_string()));

        assert!(f
            .gateway
            .update_batch(batch_id, BatchUpdate::started(Utc::now()))
            .await
            .is_err());
        assert!(f
            .gateway
            .update_batch(batch_id, BatchUpdate::started(Utc::now()))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_records_with_missing_rows_are_skipped() {
        let f = fixture(None);
        let batch_id = f.gateway.record(f.record).unwrap().batch_id;
        f.gateway.insert_record(PromotionRecord::new(
            batch_id,
            Uuid::new_v4(),
            f.from_class,
            None,
            PromotionType::Retained,
        ));
        f.gateway.insert_record(PromotionRecord::new(
            batch_id,
            f.student,
            Uuid::new_v4(),
            None,
            PromotionType::Retained,
        ));

        let detail = f.gateway.find_batch_with_records(batch_id).await.unwrap().unwrap();
        let ids: Vec<Uuid> = detail.records.iter().map(|r| r.record.id).collect();
        assert_eq!(ids, vec![f.record]);
    }

    #[tokio::test]
    async fn test_find_batch_preserves_insertion_order() {
        let f = fixture(None);
        let batch_id = f.gateway.record(f.record).unwrap().batch_id;
        let from = f.from_class;
        let mut expected = vec![f.record];
        for i in 0..5 {
            let student = f
                .gateway
                .insert_student(Student::new(format!("S{i}"), "Student", from));
            expected.push(f.gateway.insert_record(PromotionRecord::new(
                batch_id,
                student,
                from,
                None,
                PromotionType::Retained,
            )));
        }

        let detail = f.gateway.find_batch_with_records(batch_id).await.unwrap().unwrap();
        let ids: Vec<Uuid> = detail.records.iter().map(|r| r.record.id).collect();
        assert_eq!(ids, expected);
        assert!(f
            .gateway
            .find_batch_with_records(Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }
}

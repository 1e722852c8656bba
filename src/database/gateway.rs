//! # Persistence Gateway
//!
//! The seam between the promotion processor and storage. The processor only
//! sees these traits, so Postgres and the in-memory fake are interchangeable.
//!
//! A unit of work is opened with [`PromotionGateway::begin`] and made durable
//! with [`GatewayTransaction::commit`]. Dropping a transaction without
//! committing rolls it back.

use super::errors::GatewayResult;
use crate::models::{BatchUpdate, PromotionBatchDetail, RecordUpdate, StudentUpdate};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait PromotionGateway: Send + Sync {
    /// Load a batch with its records, students and classes, in storage order.
    /// Records whose student or source class row is missing are left out.
    async fn find_batch_with_records(
        &self,
        batch_id: Uuid,
    ) -> GatewayResult<Option<PromotionBatchDetail>>;

    async fn update_batch(&self, batch_id: Uuid, update: BatchUpdate) -> GatewayResult<()>;

    async fn begin(&self) -> GatewayResult<Box<dyn GatewayTransaction>>;
}

#[async_trait]
pub trait GatewayTransaction: Send {
    async fn update_record(&mut self, record_id: Uuid, update: RecordUpdate) -> GatewayResult<()>;

    async fn update_student(
        &mut self,
        student_id: Uuid,
        update: StudentUpdate,
    ) -> GatewayResult<()>;

    /// Move `current_enrollment` by `delta`, honoring capacity and the
    /// non-negative floor
    async fn update_class_enrollment(&mut self, class_id: Uuid, delta: i32) -> GatewayResult<()>;

    async fn commit(self: Box<Self>) -> GatewayResult<()>;
}

//! # Postgres Gateway
//!
//! [`PromotionGateway`] over a SQLx `PgPool`. Queries are runtime-checked so
//! the crate builds without a live database. Statuses are stored as text and
//! parsed through the enums' `FromStr`.

use super::errors::{GatewayError, GatewayResult};
use super::gateway::{GatewayTransaction, PromotionGateway};
use crate::models::{
    BatchUpdate, Class, PromotionBatch, PromotionBatchDetail, PromotionRecord,
    PromotionRecordDetail, RecordUpdate, Student, StudentUpdate,
};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgPromotionGateway {
    pool: PgPool,
}

impl PgPromotionGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_column<T: FromStr<Err = String>>(row: &PgRow, column: &str) -> GatewayResult<T> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(GatewayError::Database)
}

fn batch_from_row(row: &PgRow) -> GatewayResult<PromotionBatch> {
    Ok(PromotionBatch {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        academic_year: row.try_get("academic_year")?,
        status: parse_column(row, "status")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        promoted_students: row.try_get("promoted_students")?,
        retained_students: row.try_get("retained_students")?,
        graduated_students: row.try_get("graduated_students")?,
        created_by: row.try_get("created_by")?,
    })
}

fn record_detail_from_row(row: &PgRow) -> GatewayResult<PromotionRecordDetail> {
    let record = PromotionRecord {
        id: row.try_get("record_id")?,
        batch_id: row.try_get("batch_id")?,
        student_id: row.try_get("student_id")?,
        from_class_id: row.try_get("from_class_id")?,
        to_class_id: row.try_get("to_class_id")?,
        promotion_type: parse_column(row, "promotion_type")?,
        status: parse_column(row, "record_status")?,
        processed_at: row.try_get("processed_at")?,
    };

    let student = Student {
        id: record.student_id,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        roll_number: row.try_get("roll_number")?,
        class_id: row.try_get("student_class_id")?,
        academic_status: parse_column(row, "academic_status")?,
    };

    let from_class = Class {
        id: record.from_class_id,
        name: row.try_get("from_class_name")?,
        grade: row.try_get("from_class_grade")?,
        capacity: row.try_get("from_class_capacity")?,
        current_enrollment: row.try_get("from_class_enrollment")?,
    };

    let to_class = match record.to_class_id {
        Some(id) => {
            let name: Option<String> = row.try_get("to_class_name")?;
            match name {
                Some(name) => Some(Class {
                    id,
                    name,
                    grade: row.try_get("to_class_grade")?,
                    capacity: row.try_get("to_class_capacity")?,
                    current_enrollment: row.try_get("to_class_enrollment")?,
                }),
                None => None,
            }
        }
        None => None,
    };

    Ok(PromotionRecordDetail {
        record,
        student,
        from_class,
        to_class,
    })
}

#[async_trait]
impl PromotionGateway for PgPromotionGateway {
    async fn find_batch_with_records(
        &self,
        batch_id: Uuid,
    ) -> GatewayResult<Option<PromotionBatchDetail>> {
        let Some(batch_row) = sqlx::query(
            r#"
            SELECT id, name, academic_year, status, started_at, completed_at,
                   promoted_students, retained_students, graduated_students, created_by
            FROM promotion_batches
            WHERE id = $1
            "#,
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let batch = batch_from_row(&batch_row)?;

        let rows = sqlx::query(
            r#"
            SELECT r.id AS record_id, r.batch_id, r.student_id, r.from_class_id, r.to_class_id,
                   r.promotion_type, r.status AS record_status, r.processed_at,
                   s.first_name, s.last_name, s.roll_number, s.class_id AS student_class_id,
                   s.academic_status,
                   fc.name AS from_class_name, fc.grade AS from_class_grade,
                   fc.capacity AS from_class_capacity, fc.current_enrollment AS from_class_enrollment,
                   tc.name AS to_class_name, tc.grade AS to_class_grade,
                   tc.capacity AS to_class_capacity, tc.current_enrollment AS to_class_enrollment
            FROM promotion_records r
            JOIN students s ON s.id = r.student_id
            JOIN classes fc ON fc.id = r.from_class_id
            LEFT JOIN classes tc ON tc.id = r.to_class_id
            WHERE r.batch_id = $1
            ORDER BY r.created_at, r.id
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(record_detail_from_row)
            .collect::<GatewayResult<Vec<_>>>()?;

        debug!(batch_id = %batch_id, records = records.len(), "Loaded promotion batch");

        Ok(Some(PromotionBatchDetail { batch, records }))
    }

    async fn update_batch(&self, batch_id: Uuid, update: BatchUpdate) -> GatewayResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE promotion_batches
            SET status = COALESCE($1, status),
                started_at = COALESCE($2, started_at),
                completed_at = COALESCE($3, completed_at),
                promoted_students = COALESCE($4, promoted_students),
                retained_students = COALESCE($5, retained_students),
                graduated_students = COALESCE($6, graduated_students),
                updated_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(update.status.map(|status| status.to_string()))
        .bind(update.started_at)
        .bind(update.completed_at)
        .bind(update.promoted_students)
        .bind(update.retained_students)
        .bind(update.graduated_students)
        .bind(batch_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found("promotion_batch"));
        }
        Ok(())
    }

    async fn begin(&self) -> GatewayResult<Box<dyn GatewayTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgGatewayTransaction { tx: Some(tx) }))
    }
}

/// Wraps a SQLx transaction; SQLx rolls back on drop if never committed
pub struct PgGatewayTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgGatewayTransaction {
    fn tx(&mut self) -> GatewayResult<&mut Transaction<'static, Postgres>> {
        self.tx.as_mut().ok_or(GatewayError::TransactionClosed)
    }
}

#[async_trait]
impl GatewayTransaction for PgGatewayTransaction {
    async fn update_record(&mut self, record_id: Uuid, update: RecordUpdate) -> GatewayResult<()> {
        let tx = self.tx()?;
        let result = sqlx::query(
            r#"
            UPDATE promotion_records
            SET status = $1, processed_at = COALESCE($2, processed_at), updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(update.status.to_string())
        .bind(update.processed_at)
        .bind(record_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found("promotion_record"));
        }
        Ok(())
    }

    async fn update_student(
        &mut self,
        student_id: Uuid,
        update: StudentUpdate,
    ) -> GatewayResult<()> {
        let tx = self.tx()?;
        let result = sqlx::query(
            r#"
            UPDATE students
            SET class_id = COALESCE($1, class_id),
                academic_status = COALESCE($2, academic_status),
                updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(update.class_id)
        .bind(update.academic_status.map(|status| status.to_string()))
        .bind(student_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found("student"));
        }
        Ok(())
    }

    async fn update_class_enrollment(&mut self, class_id: Uuid, delta: i32) -> GatewayResult<()> {
        let tx = self.tx()?;
        let result = sqlx::query(
            r#"
            UPDATE classes
            SET current_enrollment = current_enrollment + $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(delta)
        .bind(class_id)
        .execute(&mut **tx)
        .await
        .map_err(|error| match GatewayError::from(error) {
            GatewayError::CapacityExceeded { .. } => GatewayError::CapacityExceeded {
                class_id: Some(class_id),
            },
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found("class"));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> GatewayResult<()> {
        let mut this = self;
        let tx = this.tx.take().ok_or(GatewayError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }
}

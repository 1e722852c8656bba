use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Success,
    Fail,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// One audit log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub user_id: Uuid,
    pub action: AuditAction,
    pub module: String,
    pub status: AuditStatus,
    pub details: String,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        user_id: Uuid,
        action: AuditAction,
        module: impl Into<String>,
        status: AuditStatus,
        details: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            action,
            module: module.into(),
            status,
            details: details.into(),
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Audit write failed: {0}")]
    Write(#[from] sqlx::Error),
    #[error("Audit recorder unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AuditRecorder: Send + Sync {
    async fn log(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

/// Write `entry`, logging instead of propagating any failure
pub async fn record_best_effort(recorder: &dyn AuditRecorder, entry: AuditEntry) {
    let module = entry.module.clone();
    if let Err(error) = recorder.log(entry).await {
        warn!(module = %module, error = %error, "Failed to write audit log entry");
    }
}

/// Inserts into the `audit_logs` table
#[derive(Debug, Clone)]
pub struct PgAuditRecorder {
    pool: PgPool,
}

impl PgAuditRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRecorder for PgAuditRecorder {
    async fn log(&self, entry: AuditEntry) -> Result<(), AuditError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, action, module, status, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(entry.action.to_string())
        .bind(entry.module)
        .bind(entry.status.to_string())
        .bind(entry.details)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Keeps entries in memory. Can be switched to fail every write.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditRecorder {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
    failing: Arc<Mutex<bool>>,
}

impl InMemoryAuditRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder whose every write fails
    pub fn failing() -> Self {
        let recorder = Self::default();
        *recorder.failing.lock() = true;
        recorder
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    pub fn entries_for_module(&self, module: &str) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.module == module)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditRecorder for InMemoryAuditRecorder {
    async fn log(&self, entry: AuditEntry) -> Result<(), AuditError> {
        if *self.failing.lock() {
            return Err(AuditError::Unavailable("recorder is failing".to_string()));
        }
        self.entries.lock().push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_recorder_keeps_entries() {
        let recorder = InMemoryAuditRecorder::new();
        let entry = AuditEntry::new(
            Uuid::new_v4(),
            AuditAction::Update,
            "PromotionBatch",
            AuditStatus::Success,
            "done",
        );
        recorder.log(entry.clone()).await.unwrap();

        assert_eq!(recorder.entries(), vec![entry]);
        assert_eq!(recorder.entries_for_module("PromotionRecord").len(), 0);
    }

    #[tokio::test]
    async fn test_best_effort_swallows_failures() {
        let recorder = InMemoryAuditRecorder::failing();
        record_best_effort(
            &recorder,
            AuditEntry::new(
                Uuid::new_v4(),
                AuditAction::Update,
                "PromotionBatch",
                AuditStatus::Fail,
                "ignored",
            ),
        )
        .await;
        assert!(recorder.entries().is_empty());
    }

    #[test]
    fn test_audit_vocabulary() {
        assert_eq!(AuditAction::Update.to_string(), "UPDATE");
        assert_eq!(AuditStatus::Fail.to_string(), "FAIL");
    }
}

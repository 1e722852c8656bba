//! # Promotion Batch Processor
//!
//! Turns a promotion batch and its precomputed records into individual,
//! durable, audited student moves while publishing live progress.
//!
//! ## Flow
//!
//! 1. [`PromotionProcessor::start_promotion_job`] loads the batch (failing
//!    fast if it does not exist), registers a fresh [`PromotionJob`] and
//!    launches the run in the background.
//! 2. [`PromotionProcessor::process_promotion_batch`] walks the records in
//!    load order, one transaction per record. A failed record is classified,
//!    counted and skipped; it never stops the batch.
//! 3. The batch row is finalized with the success counters and `COMPLETED`,
//!    or `FAILED` as soon as a single record failed.
//!
//! A failure outside the per-record handling (the opening or closing batch
//! update) fails the whole job. Since nobody awaits the run, such failures
//! surface only through the job, the logs and the batch row.
//!
//! ## Known hazard
//!
//! Starting a second job for a batch whose job is still running replaces the
//! registry entry but does not stop the first run, which keeps writing to the
//! same batch. [`DuplicateStartPolicy::Reject`] refuses the second start
//! instead.

use crate::audit::{record_best_effort, AuditAction, AuditEntry, AuditRecorder, AuditStatus};
use crate::config::{DuplicateStartPolicy, PromotionConfig};
use crate::constants::{audit_modules, BATCH_FAILURE_PREFIX};
use crate::database::PromotionGateway;
use crate::error::{PromotionError, Result};
use crate::logging::{log_batch_operation, log_error, log_record_operation};
use crate::models::{
    BatchUpdate, PromotionBatchDetail, PromotionRecordDetail, RecordUpdate, StudentUpdate,
};
use crate::orchestration::error_classifier::{classify_failure, FailureContext};
use crate::orchestration::task_launcher::{JobHandle, TaskLauncher, TokioTaskLauncher};
use crate::registry::{JobRegistry, PromotionJob, SharedJob};
use crate::state_machine::{BatchStatus, PromotionType, RecordStatus};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Tunables the processor reads from [`PromotionConfig`]
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub throttle_every: usize,
    pub throttle_delay: Duration,
    pub final_grade: i32,
    pub duplicate_start_policy: DuplicateStartPolicy,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self::from(&PromotionConfig::default())
    }
}

impl From<&PromotionConfig> for ProcessorSettings {
    fn from(config: &PromotionConfig) -> Self {
        Self {
            throttle_every: config.throttle_every.max(1),
            throttle_delay: config.throttle_delay(),
            final_grade: config.final_grade,
            duplicate_start_policy: config.duplicate_start_policy,
        }
    }
}

#[derive(Clone)]
pub struct PromotionProcessor {
    gateway: Arc<dyn PromotionGateway>,
    audit: Arc<dyn AuditRecorder>,
    registry: JobRegistry,
    launcher: Arc<dyn TaskLauncher>,
    settings: ProcessorSettings,
}

impl std::fmt::Debug for PromotionProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromotionProcessor")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish()
    }
}

impl PromotionProcessor {
    pub fn new(
        gateway: Arc<dyn PromotionGateway>,
        audit: Arc<dyn AuditRecorder>,
        registry: JobRegistry,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            gateway,
            audit,
            registry,
            launcher: Arc::new(TokioTaskLauncher),
            settings,
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn TaskLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    /// Load the batch, register a new job and launch the run.
    ///
    /// Returns once the run is scheduled. A missing batch is the only failure
    /// reported here; everything after scheduling is observed through
    /// [`JobRegistry::get_job_progress`] or a progress subscriber.
    #[instrument(skip(self))]
    pub async fn start_promotion_job(&self, batch_id: Uuid, user_id: Uuid) -> Result<JobHandle> {
        let batch = self
            .gateway
            .find_batch_with_records(batch_id)
            .await?
            .ok_or(PromotionError::BatchNotFound { batch_id })?;

        let total_students = batch.records.len();
        let job = PromotionJob::new(batch_id, user_id, total_students);

        let shared = match self.settings.duplicate_start_policy {
            DuplicateStartPolicy::Reject => match self.registry.register_job_unless_running(job) {
                Ok(shared) => shared,
                Err(existing) => {
                    warn!(
                        batch_id = %batch_id,
                        status = %existing.status,
                        "Rejecting duplicate promotion job start"
                    );
                    return Err(PromotionError::JobAlreadyRunning { batch_id });
                }
            },
            DuplicateStartPolicy::Overwrite => {
                if let Some(existing) = self.registry.get_job_progress(batch_id) {
                    if !existing.status.is_terminal() {
                        warn!(
                            batch_id = %batch_id,
                            status = %existing.status,
                            processed = existing.processed_students,
                            "Replacing a promotion job that is still running; the earlier run is not stopped"
                        );
                    }
                }
                self.registry.register_job(job)
            }
        };

        let processor = self.clone();
        let handle = self.launcher.launch(Box::pin(async move {
            processor.process_promotion_batch(batch, shared).await;
        }))?;

        log_batch_operation(
            "start_promotion_job",
            batch_id,
            "scheduled",
            Some(&format!("{total_students} records")),
        );

        Ok(handle)
    }

    /// Run a batch to completion against `job`.
    ///
    /// Normally launched by [`Self::start_promotion_job`]. Never returns an
    /// error: a run-level failure is written to the job and the batch row.
    pub async fn process_promotion_batch(&self, batch: PromotionBatchDetail, job: SharedJob) {
        let batch_id = batch.batch.id;

        if let Err(error) = self.run_batch(&batch, &job).await {
            let failed_at = Utc::now();
            let snapshot = {
                let mut job = job.write();
                job.mark_failed(failed_at, format!("{BATCH_FAILURE_PREFIX}: {error}"));
                job.clone()
            };
            self.registry.notify(batch_id, &snapshot);

            if let Err(update_error) = self
                .gateway
                .update_batch(batch_id, BatchUpdate::failed(failed_at))
                .await
            {
                log_error(
                    "PromotionProcessor",
                    "mark_batch_failed",
                    &update_error.to_string(),
                    Some(&batch_id.to_string()),
                );
            }

            log_error(
                "PromotionProcessor",
                "process_promotion_batch",
                &error.to_string(),
                Some(&batch_id.to_string()),
            );
        }
    }

    async fn run_batch(&self, batch: &PromotionBatchDetail, job: &SharedJob) -> Result<()> {
        let batch_id = batch.batch.id;
        let started_at = Utc::now();

        let (user_id, snapshot) = {
            let mut job = job.write();
            job.mark_started(started_at);
            (job.user_id, job.clone())
        };
        self.registry.notify(batch_id, &snapshot);

        self.gateway
            .update_batch(batch_id, BatchUpdate::started(started_at))
            .await?;

        log_batch_operation(
            "process_promotion_batch",
            batch_id,
            "in_progress",
            Some(&format!("{} records", batch.records.len())),
        );

        for (index, detail) in batch.records.iter().enumerate() {
            let outcome = self.process_individual_promotion(detail, user_id).await;

            let snapshot = match outcome {
                Ok(()) => {
                    let mut job = job.write();
                    job.record_success(detail.record.promotion_type);
                    job.clone()
                }
                Err(error) => {
                    let context = FailureContext::from_detail(detail, self.settings.final_grade);
                    let reason = classify_failure(&error, &context);
                    log_error(
                        "PromotionProcessor",
                        "process_individual_promotion",
                        &error.to_string(),
                        Some(&format!(
                            "batch {batch_id}, record {}, student {}",
                            detail.record.id, detail.student.id
                        )),
                    );

                    let mut job = job.write();
                    job.record_failure(format!("{}: {reason}", detail.student.full_name()));
                    job.clone()
                }
            };
            self.registry.notify(batch_id, &snapshot);

            if index % self.settings.throttle_every == 0 && !self.settings.throttle_delay.is_zero()
            {
                tokio::time::sleep(self.settings.throttle_delay).await;
            }
        }

        let completed_at = Utc::now();
        let summary = {
            let mut job = job.write();
            job.mark_completed(completed_at);
            job.clone()
        };

        let batch_status = if summary.failed_students > 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::Completed
        };

        self.gateway
            .update_batch(
                batch_id,
                BatchUpdate::finished(
                    batch_status,
                    completed_at,
                    count_to_i32(summary.promoted_students),
                    count_to_i32(summary.retained_students),
                    count_to_i32(summary.graduated_students),
                ),
            )
            .await?;

        self.registry.notify(batch_id, &summary);

        let audit_status = if summary.failed_students > 0 {
            AuditStatus::Fail
        } else {
            AuditStatus::Success
        };
        record_best_effort(
            self.audit.as_ref(),
            AuditEntry::new(
                user_id,
                AuditAction::Update,
                audit_modules::PROMOTION_BATCH,
                audit_status,
                format!(
                    "Promotion batch {} processed: {} promoted, {} retained, {} graduated, {} failed of {} students",
                    batch.batch.name,
                    summary.promoted_students,
                    summary.retained_students,
                    summary.graduated_students,
                    summary.failed_students,
                    summary.total_students
                ),
            ),
        )
        .await;

        info!(
            batch_id = %batch_id,
            status = %batch_status,
            promoted = summary.promoted_students,
            retained = summary.retained_students,
            graduated = summary.graduated_students,
            failed = summary.failed_students,
            "Promotion batch finished"
        );

        Ok(())
    }

    /// Apply one record inside its own transaction, then audit it.
    ///
    /// Any error rolls the whole record back and is returned to the batch
    /// loop, which counts it as a failed student.
    pub async fn process_individual_promotion(
        &self,
        detail: &PromotionRecordDetail,
        user_id: Uuid,
    ) -> Result<()> {
        let record = &detail.record;

        if !record.status.can_advance_to(RecordStatus::InProgress) {
            warn!(
                record_id = %record.id,
                student_id = %record.student_id,
                status = %record.status,
                "Restarting a promotion record left behind by an earlier run"
            );
        }

        let mut tx = self.gateway.begin().await?;

        tx.update_record(record.id, RecordUpdate::in_progress(Utc::now()))
            .await?;

        let details = match record.promotion_type {
            PromotionType::Promoted => {
                let to_class_id = record
                    .to_class_id
                    .ok_or(PromotionError::MissingTargetClass {
                        record_id: record.id,
                    })?;

                tx.update_student(record.student_id, StudentUpdate::moved_to(to_class_id))
                    .await?;
                tx.update_class_enrollment(record.from_class_id, -1).await?;
                tx.update_class_enrollment(to_class_id, 1).await?;

                let to_name = detail
                    .to_class
                    .as_ref()
                    .map(|class| class.name.clone())
                    .unwrap_or_else(|| to_class_id.to_string());
                format!(
                    "{} promoted from {} to {}",
                    detail.student.full_name(),
                    detail.from_class.name,
                    to_name
                )
            }
            PromotionType::Retained => {
                format!(
                    "{} retained in {}",
                    detail.student.full_name(),
                    detail.from_class.name
                )
            }
            PromotionType::Graduated => {
                if detail.from_class.grade < self.settings.final_grade {
                    return Err(PromotionError::NotFinalGrade {
                        student_id: record.student_id,
                        grade: detail.from_class.grade,
                        final_grade: self.settings.final_grade,
                    });
                }

                tx.update_student(record.student_id, StudentUpdate::graduated())
                    .await?;
                tx.update_class_enrollment(record.from_class_id, -1).await?;

                format!(
                    "{} graduated from {}",
                    detail.student.full_name(),
                    detail.from_class.name
                )
            }
        };

        tx.update_record(record.id, RecordUpdate::completed()).await?;
        tx.commit().await?;

        log_record_operation(
            "process_individual_promotion",
            record.batch_id,
            record.id,
            &record.promotion_type.to_string(),
            "completed",
            Some(&details),
        );

        record_best_effort(
            self.audit.as_ref(),
            AuditEntry::new(
                user_id,
                AuditAction::Update,
                audit_modules::PROMOTION_RECORD,
                AuditStatus::Success,
                details,
            ),
        )
        .await;

        Ok(())
    }

    pub fn get_job_progress(&self, batch_id: Uuid) -> Option<PromotionJob> {
        self.registry.get_job_progress(batch_id)
    }
}

fn count_to_i32(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Promotion Core
//!
//! Promotion batch processing for the school management backend.
//!
//! ## Overview
//!
//! At the end of an academic year an administrator prepares a promotion batch:
//! one precomputed decision per student to promote them to a new class, retain
//! them, or graduate them. This crate applies such a batch. Each student is
//! moved in its own transaction, class enrollments follow along, every step is
//! audited, and a live in-memory job reports progress to whoever is watching.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - The batch processor, failure classification and task launching
//! - [`registry`] - Live job progress, subscribers and cleanup
//! - [`database`] - The persistence gateway seam with Postgres and in-memory implementations
//! - [`audit`] - Best-effort audit trail
//! - [`models`] - Batches, records, students and classes
//! - [`state_machine`] - Status enums and their persisted spelling
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use promotion_core::audit::PgAuditRecorder;
//! use promotion_core::config::PromotionConfig;
//! use promotion_core::database::{DatabaseConnection, PgPromotionGateway};
//! use promotion_core::orchestration::{ProcessorSettings, PromotionProcessor};
//! use promotion_core::registry::JobRegistry;
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! # async fn example(batch_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
//! let config = PromotionConfig::from_env()?;
//! let db = DatabaseConnection::new(&config).await?;
//!
//! let processor = PromotionProcessor::new(
//!     Arc::new(PgPromotionGateway::new(db.pool().clone())),
//!     Arc::new(PgAuditRecorder::new(db.pool().clone())),
//!     JobRegistry::in_memory(config.job_retention()),
//!     ProcessorSettings::from(&config),
//! );
//!
//! // Returns as soon as the run is scheduled
//! let _handle = processor.start_promotion_job(batch_id, user_id).await?;
//!
//! if let Some(job) = processor.get_job_progress(batch_id) {
//!     println!("{}/{} students processed", job.processed_students, job.total_students);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Unit tests live next to the code. Integration suites under `tests/` run
//! against the in-memory gateway; the Postgres suite is ignored unless a
//! database is available:
//!
//! ```bash
//! cargo test
//! DATABASE_URL=postgresql://localhost/school_test cargo test -- --ignored
//! ```

pub mod audit;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod state_machine;

pub use config::{DuplicateStartPolicy, PromotionConfig};
pub use error::{PromotionError, Result};
pub use orchestration::{JobHandle, ProcessorSettings, PromotionProcessor};
pub use registry::{JobRegistry, PromotionJob};
pub use state_machine::{AcademicStatus, BatchStatus, JobStatus, PromotionType, RecordStatus};

//! # Audit Trail
//!
//! Append-only traceability records. Audit writes are best effort: a failing
//! recorder is logged and never changes the outcome of the work it describes.

pub mod recorder;

pub use recorder::{
    record_best_effort, AuditAction, AuditEntry, AuditError, AuditRecorder, AuditStatus,
    InMemoryAuditRecorder, PgAuditRecorder,
};

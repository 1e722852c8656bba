//! # System Constants
//!
//! Operational defaults and audit vocabulary shared by the promotion core.

/// Defaults applied when no configuration overrides them
pub mod defaults {
    /// Records processed between throttle pauses
    pub const THROTTLE_EVERY: usize = 10;
    /// Pause length, in milliseconds, applied every `THROTTLE_EVERY` records
    pub const THROTTLE_DELAY_MS: u64 = 100;
    /// Terminal jobs older than this are swept from the registry
    pub const JOB_RETENTION_HOURS: i64 = 24;
    /// A student must sit in this grade to graduate
    pub const FINAL_GRADE: i32 = 12;
    pub const MAX_CONNECTIONS: u32 = 10;
    pub const CLEANUP_INTERVAL_SECS: u64 = 3600;
    pub const DATABASE_URL: &str = "postgresql://localhost/school_development";
}

/// Module names written to the audit trail
pub mod audit_modules {
    pub const PROMOTION_BATCH: &str = "PromotionBatch";
    pub const PROMOTION_RECORD: &str = "PromotionRecord";
}

/// Prefix for the synthetic error appended when a whole run aborts
pub const BATCH_FAILURE_PREFIX: &str = "Batch processing failed";

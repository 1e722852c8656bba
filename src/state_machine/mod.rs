// Status enums for promotion batches, records and jobs.
//
// Statuses are stored as plain strings in the database and parsed through
// `FromStr`, so the persisted spelling lives next to the enum definitions.

pub mod states;

pub use states::{AcademicStatus, BatchStatus, JobStatus, PromotionType, RecordStatus};

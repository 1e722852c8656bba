use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted lifecycle of a promotion batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// Created with records, not yet picked up
    #[default]
    Pending,
    /// A job is walking the records
    InProgress,
    /// Every record was processed successfully
    Completed,
    /// At least one record failed, or the run itself aborted
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Invalid batch status: {s}")),
        }
    }
}

/// Status of a single promotion record.
///
/// A record only ever moves forward. A failed record is left where the
/// failing transaction found it, since the rollback discards the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl RecordStatus {
    /// True only for strictly forward moves
    pub fn can_advance_to(&self, next: RecordStatus) -> bool {
        next > *self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(format!("Invalid promotion record status: {s}")),
        }
    }
}

/// Status of the in-memory job mirror.
///
/// Kept separate from [`BatchStatus`]: a job finishes `Completed` even when
/// some records failed, while the persisted batch is then `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// The three mutually exclusive outcomes for a student in a promotion cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionType {
    Promoted,
    Retained,
    Graduated,
}

impl fmt::Display for PromotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Promoted => write!(f, "PROMOTED"),
            Self::Retained => write!(f, "RETAINED"),
            Self::Graduated => write!(f, "GRADUATED"),
        }
    }
}

impl std::str::FromStr for PromotionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROMOTED" => Ok(Self::Promoted),
            "RETAINED" => Ok(Self::Retained),
            "GRADUATED" => Ok(Self::Graduated),
            _ => Err(format!("Invalid promotion type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AcademicStatus {
    #[default]
    Active,
    Graduated,
}

impl fmt::Display for AcademicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Graduated => write!(f, "graduated"),
        }
    }
}

impl std::str::FromStr for AcademicStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "graduated" => Ok(Self::Graduated),
            _ => Err(format!("Invalid academic status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_status_terminal_check() {
        assert!(BatchStatus::Completed.is_terminal());
        assert!(BatchStatus::Failed.is_terminal());
        assert!(!BatchStatus::Pending.is_terminal());
        assert!(!BatchStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_record_status_only_advances() {
        assert!(RecordStatus::Pending.can_advance_to(RecordStatus::InProgress));
        assert!(RecordStatus::InProgress.can_advance_to(RecordStatus::Completed));
        assert!(!RecordStatus::Completed.can_advance_to(RecordStatus::InProgress));
        assert!(!RecordStatus::InProgress.can_advance_to(RecordStatus::InProgress));
    }

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(BatchStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(
            "COMPLETED".parse::<RecordStatus>().unwrap(),
            RecordStatus::Completed
        );
        assert_eq!(
            "GRADUATED".parse::<PromotionType>().unwrap(),
            PromotionType::Graduated
        );
        assert!("graduated".parse::<PromotionType>().is_err());
        assert_eq!(AcademicStatus::Graduated.to_string(), "graduated");
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&JobStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");

        let parsed: JobStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, JobStatus::InProgress);

        let academic = serde_json::to_string(&AcademicStatus::Active).unwrap();
        assert_eq!(academic, "\"active\"");
    }
}

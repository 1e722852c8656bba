use crate::database::errors::GatewayError;
use uuid::Uuid;

/// Errors raised by the promotion core
#[derive(Debug, thiserror::Error)]
pub enum PromotionError {
    #[error("Promotion batch {batch_id} not found")]
    BatchNotFound { batch_id: Uuid },

    #[error("Promotion job for batch {batch_id} is already running")]
    JobAlreadyRunning { batch_id: Uuid },

    #[error("Promotion record {record_id} has no target class")]
    MissingTargetClass { record_id: Uuid },

    #[error("Student {student_id} is in grade {grade}, graduation requires grade {final_grade}")]
    NotFinalGrade {
        student_id: Uuid,
        grade: i32,
        final_grade: i32,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Task launch error: {0}")]
    TaskLaunch(String),
}

impl From<config::ConfigError> for PromotionError {
    fn from(error: config::ConfigError) -> Self {
        PromotionError::Configuration(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PromotionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_errors_are_transparent() {
        let error: PromotionError = GatewayError::NotFound {
            entity: "student".to_string(),
        }
        .into();
        assert_eq!(error.to_string(), "student record not found");
    }

    #[test]
    fn test_not_final_grade_message() {
        let error = PromotionError::NotFinalGrade {
            student_id: Uuid::nil(),
            grade: 10,
            final_grade: 12,
        };
        assert!(error.to_string().contains("grade 10"));
    }
}

//! # Promotion Failure Classification
//!
//! Turns the error behind a failed record into one of a fixed set of
//! human-readable reasons, shown to operators as `"{student}: {reason}"`.
//!
//! Persistence failures are matched on their [`GatewayError`] tag. When the
//! tag says nothing specific, the record's own context is consulted. Anything
//! left falls through with its raw message.
//!
//! Priority order:
//!
//! ```text
//! ForeignKeyViolation { field: "class_id" }  -> Target class not found or invalid
//! ForeignKeyViolation { .. }                 -> Database constraint violation
//! UniqueViolation { .. }                     -> Student already exists in target class
//! NotFound { .. }                            -> Student or class record not found
//! CapacityExceeded { .. }                    -> Target class is at full capacity
//! PROMOTED without a target class            -> No target class available for promotion
//! GRADUATED below the final grade            -> Student not in final grade for graduation
//! anything else                              -> the error message itself
//! ```

use crate::database::errors::GatewayError;
use crate::error::PromotionError;
use crate::models::PromotionRecordDetail;
use crate::state_machine::PromotionType;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Column whose foreign key points at the student's class
const STUDENT_CLASS_FIELD: &str = "class_id";

/// What the classifier knows about the failing record
#[derive(Debug, Clone)]
pub struct FailureContext {
    pub promotion_type: PromotionType,
    pub to_class_id: Option<Uuid>,
    pub from_class_grade: i32,
    pub final_grade: i32,
}

impl FailureContext {
    pub fn from_detail(detail: &PromotionRecordDetail, final_grade: i32) -> Self {
        Self {
            promotion_type: detail.record.promotion_type,
            to_class_id: detail.record.to_class_id,
            from_class_grade: detail.from_class.grade,
            final_grade,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    TargetClassInvalid,
    ConstraintViolation,
    AlreadyInTargetClass,
    RecordNotFound,
    ClassAtCapacity,
    NoTargetClass,
    NotFinalGrade,
    Unclassified(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetClassInvalid => write!(f, "Target class not found or invalid"),
            Self::ConstraintViolation => write!(f, "Database constraint violation"),
            Self::AlreadyInTargetClass => write!(f, "Student already exists in target class"),
            Self::RecordNotFound => write!(f, "Student or class record not found"),
            Self::ClassAtCapacity => write!(f, "Target class is at full capacity"),
            Self::NoTargetClass => write!(f, "No target class available for promotion"),
            Self::NotFinalGrade => write!(f, "Student not in final grade for graduation"),
            Self::Unclassified(message) => write!(f, "{message}"),
        }
    }
}

pub fn classify_failure(error: &PromotionError, context: &FailureContext) -> FailureReason {
    if let PromotionError::Gateway(gateway_error) = error {
        match gateway_error {
            GatewayError::ForeignKeyViolation { field } if field == STUDENT_CLASS_FIELD => {
                return FailureReason::TargetClassInvalid;
            }
            GatewayError::ForeignKeyViolation { .. } => return FailureReason::ConstraintViolation,
            GatewayError::UniqueViolation { .. } => return FailureReason::AlreadyInTargetClass,
            GatewayError::NotFound { .. } => return FailureReason::RecordNotFound,
            GatewayError::CapacityExceeded { .. } => return FailureReason::ClassAtCapacity,
            GatewayError::Database(_) | GatewayError::TransactionClosed => {}
        }
    }

    if context.promotion_type == PromotionType::Promoted && context.to_class_id.is_none() {
        return FailureReason::NoTargetClass;
    }

    if context.promotion_type == PromotionType::Graduated
        && context.from_class_grade < context.final_grade
    {
        return FailureReason::NotFinalGrade;
    }

    FailureReason::Unclassified(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(promotion_type: PromotionType, to_class_id: Option<Uuid>, grade: i32) -> FailureContext {
        FailureContext {
            promotion_type,
            to_class_id,
            from_class_grade: grade,
            final_grade: 12,
        }
    }

    fn gateway(error: GatewayError) -> PromotionError {
        PromotionError::Gateway(error)
    }

    #[test]
    fn test_foreign_key_on_class_is_target_class_invalid() {
        let error = gateway(GatewayError::ForeignKeyViolation {
            field: "class_id".to_string(),
        });
        let reason = classify_failure(&error, &context(PromotionType::Promoted, Some(Uuid::new_v4()), 5));
        assert_eq!(reason, FailureReason::TargetClassInvalid);
        assert_eq!(reason.to_string(), "Target class not found or invalid");
    }

    #[test]
    fn test_other_foreign_key_is_generic_violation() {
        let error = gateway(GatewayError::ForeignKeyViolation {
            field: "to_class_id".to_string(),
        });
        let reason = classify_failure(&error, &context(PromotionType::Promoted, Some(Uuid::new_v4()), 5));
        assert_eq!(reason.to_string(), "Database constraint violation");
    }

    #[test]
    fn test_tags_take_priority_over_context() {
        // A graduation below the final grade that hit a capacity tag reports capacity
        let error = gateway(GatewayError::CapacityExceeded { class_id: None });
        let reason = classify_failure(&error, &context(PromotionType::Graduated, None, 10));
        assert_eq!(reason, FailureReason::ClassAtCapacity);

        let error = gateway(GatewayError::UniqueViolation {
            field: "roll_number".to_string(),
        });
        let reason = classify_failure(&error, &context(PromotionType::Promoted, None, 5));
        assert_eq!(reason.to_string(), "Student already exists in target class");

        let error = gateway(GatewayError::not_found("student"));
        let reason = classify_failure(&error, &context(PromotionType::Retained, None, 5));
        assert_eq!(reason.to_string(), "Student or class record not found");
    }

    #[test]
    fn test_missing_target_class_for_promotion() {
        let error = PromotionError::MissingTargetClass {
            record_id: Uuid::new_v4(),
        };
        let reason = classify_failure(&error, &context(PromotionType::Promoted, None, 5));
        assert_eq!(reason.to_string(), "No target class available for promotion");
    }

    #[test]
    fn test_graduation_below_final_grade() {
        let error = PromotionError::NotFinalGrade {
            student_id: Uuid::new_v4(),
            grade: 10,
            final_grade: 12,
        };
        let reason = classify_failure(&error, &context(PromotionType::Graduated, None, 10));
        assert_eq!(reason.to_string(), "Student not in final grade for graduation");
    }

    #[test]
    fn test_untagged_errors_fall_back_to_message() {
        let error = gateway(GatewayError::Database("deadlock detected".to_string()));
        let reason = classify_failure(&error, &context(PromotionType::Graduated, None, 12));
        assert_eq!(reason.to_string(), "database error: deadlock detected");
    }
}

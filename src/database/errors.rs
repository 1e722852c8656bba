//! Tagged persistence errors.
//!
//! Failures are classified by variant rather than by message text. The
//! Postgres mapping reads SQLSTATE codes and constraint names; the in-memory
//! gateway raises the same variants directly.

use uuid::Uuid;

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("foreign key constraint violated on field `{field}`")]
    ForeignKeyViolation { field: String },

    #[error("unique constraint violated on field `{field}`")]
    UniqueViolation { field: String },

    #[error("{entity} record not found")]
    NotFound { entity: String },

    #[error("class capacity exceeded")]
    CapacityExceeded { class_id: Option<Uuid> },

    #[error("database error: {0}")]
    Database(String),

    #[error("transaction already committed or rolled back")]
    TransactionClosed,
}

impl GatewayError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => GatewayError::not_found("row"),
            sqlx::Error::Database(db_error) => {
                let field = constraint_field(db_error.table(), db_error.constraint());
                match db_error.code().as_deref() {
                    // foreign_key_violation
                    Some("23503") => GatewayError::ForeignKeyViolation { field },
                    // unique_violation
                    Some("23505") => GatewayError::UniqueViolation { field },
                    // check_violation
                    Some("23514")
                        if db_error
                            .constraint()
                            .is_some_and(|name| name.contains("capacity")) =>
                    {
                        GatewayError::CapacityExceeded { class_id: None }
                    }
                    _ => GatewayError::Database(db_error.message().to_string()),
                }
            }
            other => GatewayError::Database(other.to_string()),
        }
    }
}

/// Recover the column from a `{table}_{column}_{fkey|key}` constraint name
fn constraint_field(table: Option<&str>, constraint: Option<&str>) -> String {
    let Some(constraint) = constraint else {
        return "unknown".to_string();
    };

    let without_table = table
        .and_then(|table| constraint.strip_prefix(table))
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(constraint);

    without_table
        .strip_suffix("_fkey")
        .or_else(|| without_table.strip_suffix("_key"))
        .unwrap_or(without_table)
        .to_string()
}

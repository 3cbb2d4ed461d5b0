//! Database-specific error types and conversions.

use keyward_core::error::KeywardError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Malformed record: {0}")]
    InvalidRecord(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate {entity}: {detail}")]
    Duplicate { entity: String, detail: String },
}

impl DbError {
    /// Classify a failed statement, recognising unique index violations.
    pub(crate) fn from_statement(err: impl std::fmt::Display, entity: &str) -> Self {
        let detail = err.to_string();
        if detail.contains("already contains") {
            DbError::Duplicate {
                entity: entity.into(),
                detail,
            }
        } else {
            DbError::Query(detail)
        }
    }
}

impl From<DbError> for KeywardError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => KeywardError::NotFound { entity, id },
            DbError::Duplicate { entity, .. } => KeywardError::AlreadyExists { entity },
            other => KeywardError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_violation_is_duplicate() {
        let err = DbError::from_statement(
            "Database index `idx_user_username` already contains 'alice'",
            "user",
        );
        assert!(matches!(err, DbError::Duplicate { ref entity, .. } if entity == "user"));
        assert!(matches!(
            KeywardError::from(err),
            KeywardError::AlreadyExists { .. }
        ));
    }

    #[test]
    fn other_failures_are_database_errors() {
        let err = DbError::from_statement("Parse error", "user");
        assert!(matches!(
            KeywardError::from(err),
            KeywardError::Database(_)
        ));
    }
}

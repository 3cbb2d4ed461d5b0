//! Error types for Keyward.

use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum KeywardError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// More than one record matched criteria that must identify a single
    /// record. Signals a caller bug, not a missing record.
    #[error("Ambiguous criteria: {matches} {entity} records matched")]
    AmbiguousCriteria { entity: String, matches: usize },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),
}

impl From<ValidationErrors> for KeywardError {
    fn from(errors: ValidationErrors) -> Self {
        KeywardError::Validation(errors)
    }
}

pub type KeywardResult<T> = Result<T, KeywardError>;

//! Authentication error types.

use keyward_core::error::KeywardError;
use keyward_core::validation::ValidationErrors;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no hash function configured")]
    HasherNotConfigured,

    #[error("invalid policy configuration: {0}")]
    Configuration(String),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("missing privilege: one of [{0}] is required")]
    PrivilegeRequired(String),

    #[error("login criteria must name at least one user field")]
    MissingCriteria,

    #[error("unknown login criteria field: {0}")]
    UnknownField(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for KeywardError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::HasherNotConfigured | AuthError::Configuration(_) => {
                KeywardError::Configuration(err.to_string())
            }
            AuthError::NotLoggedIn | AuthError::PrivilegeRequired(_) => {
                KeywardError::AuthorizationDenied {
                    reason: err.to_string(),
                }
            }
            AuthError::UnknownField(ref field) | AuthError::InvalidFieldValue { ref field, .. } => {
                let mut errors = ValidationErrors::new();
                errors.add(field.clone(), err.to_string());
                KeywardError::Validation(errors)
            }
            AuthError::MissingCriteria => {
                let mut errors = ValidationErrors::new();
                errors.add("criteria", err.to_string());
                KeywardError::Validation(errors)
            }
            AuthError::Crypto(msg) => KeywardError::Crypto(msg),
        }
    }
}

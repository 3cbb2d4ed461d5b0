//! Privilege domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::group::NAME_BLANK_MESSAGE;
use crate::validation::{ValidationErrors, require_present};

/// A named capability. Names are symbolic identifiers compared
/// case-sensitively (e.g. `admin`, `edit_posts`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privilege {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrivilege {
    pub name: String,
}

impl CreatePrivilege {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_present(&mut errors, "name", &self.name, NAME_BLANK_MESSAGE);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePrivilege {
    pub name: Option<String>,
}

impl UpdatePrivilege {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            require_present(&mut errors, "name", name, NAME_BLANK_MESSAGE);
        }
        errors.into_result()
    }
}

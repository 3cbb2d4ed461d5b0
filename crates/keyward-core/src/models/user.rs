//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A login-capable user record.
///
/// The plaintext password never lives here; it is staged on an
/// authenticator and only its hash reaches this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Unset until a password is successfully committed.
    pub password_hash: Option<String>,
    /// Per-user salt, used only when salting is enabled on the policy.
    pub salt: Option<String>,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A fresh, not yet persisted user.
    pub fn new(username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: None,
            salt: None,
            group_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_group(mut self, group_id: Uuid) -> Self {
        self.group_id = Some(group_id);
        self
    }
}

/// Exact-match criteria identifying user records.
///
/// Every populated field must equal the stored value; unset fields do
/// not constrain the match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilter {
    pub id: Option<Uuid>,
    pub username: Option<String>,
    pub group_id: Option<Uuid>,
}

impl UserFilter {
    pub fn by_username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Default::default()
        }
    }

    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn and_group(mut self, group_id: Uuid) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// True when no field constrains the match.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.username.is_none() && self.group_id.is_none()
    }
}

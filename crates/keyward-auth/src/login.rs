//! Login: resolve a user from identifying attributes and check the
//! submitted password.

use std::collections::HashMap;
use std::sync::Arc;

use keyward_core::error::{KeywardError, KeywardResult};
use keyward_core::models::principal::Principal;
use keyward_core::models::user::UserFilter;
use keyward_core::repository::UserRepository;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::authenticator::Authenticatable;
use crate::error::AuthError;
use crate::policy::CredentialPolicy;

/// Salt hashed on the miss path so it costs as much as a wrong password.
const DUMMY_SALT: &str = "0000000000000000";

/// Identifying attributes plus the submitted password.
#[derive(Debug, Clone)]
pub struct LoginParams {
    pub filter: UserFilter,
    pub password: String,
}

impl LoginParams {
    pub fn new(filter: UserFilter, password: impl Into<String>) -> Self {
        Self {
            filter,
            password: password.into(),
        }
    }

    pub fn username(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(UserFilter::by_username(username), password)
    }

    /// Build params from a loosely typed map (e.g. submitted form
    /// fields).
    ///
    /// `password` is removed from the map; every remaining key must name
    /// a user field (`id`, `username`, `group_id`), and at least one must
    /// be present. A missing password is treated as empty and can never
    /// match a stored hash.
    pub fn from_map(mut params: HashMap<String, String>) -> Result<Self, AuthError> {
        let password = params.remove("password").unwrap_or_default();
        let mut filter = UserFilter::default();

        for (field, value) in params {
            match field.as_str() {
                "id" => filter.id = Some(parse_uuid(&field, &value)?),
                "username" => filter.username = Some(value),
                "group_id" => filter.group_id = Some(parse_uuid(&field, &value)?),
                _ => return Err(AuthError::UnknownField(field)),
            }
        }
        if filter.is_empty() {
            return Err(AuthError::MissingCriteria);
        }

        Ok(Self { filter, password })
    }
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(value).map_err(|e| AuthError::InvalidFieldValue {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

/// Login service, one per user store.
///
/// The lookup and the hash comparison are two separate steps with no
/// transaction around them; a password changed concurrently may be
/// observed either way.
pub struct LoginService<U: UserRepository> {
    users: U,
    policy: Arc<CredentialPolicy>,
}

impl<U: UserRepository> LoginService<U> {
    pub fn new(users: U, policy: Arc<CredentialPolicy>) -> Self {
        Self { users, policy }
    }

    /// Resolve and authenticate a user.
    ///
    /// Returns `Ok(None)` both for unknown users and wrong passwords.
    /// Criteria matching several users fail with
    /// `KeywardError::AmbiguousCriteria`; criteria naming no user field
    /// fail validation.
    pub async fn login(&self, params: LoginParams) -> KeywardResult<Option<Principal>> {
        let LoginParams { filter, password } = params;
        if filter.is_empty() {
            return Err(AuthError::MissingCriteria.into());
        }

        let principal = match self.users.find_one(&filter).await {
            Ok(found) => found,
            Err(e @ KeywardError::AmbiguousCriteria { .. }) => {
                warn!(?filter, "login criteria matched more than one user");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let Some(principal) = principal else {
            let dummy_salt = self.policy.uses_salt().then_some(DUMMY_SALT);
            // Only the time spent matters; the digest itself is unused.
            let _dummy = self.policy.hash(&password, dummy_salt);
            debug!(?filter, "login failed: no matching user");
            return Ok(None);
        };

        let user = principal.user();
        if self.policy.verify(user, &password)? {
            debug!(user_id = %user.id, username = %user.username, "login succeeded");
            Ok(Some(principal))
        } else {
            debug!(user_id = %user.id, username = %user.username, "login failed: wrong password");
            Ok(None)
        }
    }
}

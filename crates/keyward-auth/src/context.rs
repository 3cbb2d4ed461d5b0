//! Per-request "current user" context.
//!
//! The surrounding web layer resolves the logged-in principal (e.g.
//! from a session) and hands it to the code that needs it as a
//! [`CurrentUser`] value.

use keyward_core::models::principal::Principal;

use crate::authenticator::Authenticatable;
use crate::error::AuthError;

#[derive(Debug, Clone, Default)]
pub struct CurrentUser {
    principal: Option<Principal>,
}

impl CurrentUser {
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn logged_in(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.principal.is_none()
    }

    /// Replace the logged-in principal, returning the previous one.
    pub fn set(&mut self, principal: Option<Principal>) -> Option<Principal> {
        std::mem::replace(&mut self.principal, principal)
    }

    pub fn has_privilege<S: AsRef<str>>(&self, names: &[S]) -> bool {
        self.principal
            .as_ref()
            .is_some_and(|p| p.has_privilege(names))
    }

    /// The logged-in principal, provided it holds one of `names`.
    pub fn require_privilege<S: AsRef<str>>(&self, names: &[S]) -> Result<&Principal, AuthError> {
        let principal = self.principal.as_ref().ok_or(AuthError::NotLoggedIn)?;
        if principal.has_privilege(names) {
            Ok(principal)
        } else {
            let wanted: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
            Err(AuthError::PrivilegeRequired(wanted.join(", ")))
        }
    }
}

//! A user loaded together with its group and the group's privileges.

use serde::{Deserialize, Serialize};

use crate::models::group::Group;
use crate::models::privilege::Privilege;
use crate::models::user::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWithPrivileges {
    pub group: Group,
    pub privileges: Vec<Privilege>,
}

impl GroupWithPrivileges {
    pub fn privilege_names(&self) -> impl Iterator<Item = &str> {
        self.privileges.iter().map(|p| p.name.as_str())
    }
}

/// The authenticated (or about to be authenticated) identity.
///
/// `group` is `None` both for users without a group and for users
/// whose group no longer exists; either way they hold no privileges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user: User,
    pub group: Option<GroupWithPrivileges>,
}

impl Principal {
    pub fn new(user: User, group: Option<GroupWithPrivileges>) -> Self {
        Self { user, group }
    }

    /// A principal with no loaded group, e.g. a user being registered.
    pub fn detached(user: User) -> Self {
        Self { user, group: None }
    }
}

//! Privilege checks against group membership.

use keyward_core::models::principal::GroupWithPrivileges;

/// True iff `group` holds a privilege named exactly like one of `names`.
///
/// A missing group holds no privileges. Stops at the first match.
pub fn has_privilege<S: AsRef<str>>(group: Option<&GroupWithPrivileges>, names: &[S]) -> bool {
    let Some(group) = group else {
        return false;
    };
    group
        .privilege_names()
        .any(|held| names.iter().any(|wanted| wanted.as_ref() == held))
}

//! Password staging and validation for a user record.
//!
//! Setting a password is a two-phase operation: [`UserAuthenticator::
//! stage_password`] hashes the candidate onto the record immediately,
//! and [`UserAuthenticator::validate`] decides whether that speculative
//! hash may be kept. A failed validation restores the previous hash.
//! Either way the staged plaintext is dropped afterwards.

use keyward_core::models::principal::{GroupWithPrivileges, Principal};
use keyward_core::models::user::User;
use keyward_core::validation::{ValidationErrors, require_present};
use tracing::debug;

use crate::error::AuthError;
use crate::policy::CredentialPolicy;
use crate::privilege;

/// A record that can carry credentials and privileges.
pub trait Authenticatable {
    fn user(&self) -> &User;
    fn user_mut(&mut self) -> &mut User;
    /// The loaded group with its privileges, if the user has one.
    fn group(&self) -> Option<&GroupWithPrivileges>;

    /// True iff the user's group holds any privilege in `names`.
    fn has_privilege<S: AsRef<str>>(&self, names: &[S]) -> bool {
        privilege::has_privilege(self.group(), names)
    }
}

impl Authenticatable for Principal {
    fn user(&self) -> &User {
        &self.user
    }

    fn user_mut(&mut self) -> &mut User {
        &mut self.user
    }

    fn group(&self) -> Option<&GroupWithPrivileges> {
        self.group.as_ref()
    }
}

/// Credentials as they were before a password was staged.
#[derive(Debug)]
struct Rollback {
    password_hash: Option<String>,
    salt: Option<String>,
}

#[derive(Debug)]
pub struct UserAuthenticator<'p, A> {
    record: A,
    policy: &'p CredentialPolicy,
    password: Option<String>,
    password_confirmation: Option<String>,
    rollback: Option<Rollback>,
}

impl<'p, A: Authenticatable> UserAuthenticator<'p, A> {
    pub fn new(record: A, policy: &'p CredentialPolicy) -> Self {
        Self {
            record,
            policy,
            password: None,
            password_confirmation: None,
            rollback: None,
        }
    }

    pub fn record(&self) -> &A {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut A {
        &mut self.record
    }

    pub fn into_record(self) -> A {
        self.record
    }

    pub fn policy(&self) -> &CredentialPolicy {
        self.policy
    }

    /// The staged password, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// The staged confirmation, if any.
    pub fn password_confirmation(&self) -> Option<&str> {
        self.password_confirmation.as_deref()
    }

    /// Stage `password` and hash it onto the record right away.
    ///
    /// A blank value is ignored and leaves the stored hash untouched.
    /// When salting is enabled and the user has no salt yet, one is
    /// generated first.
    pub fn set_password(&mut self, password: &str) -> Result<(), AuthError> {
        if password.trim().is_empty() {
            return Ok(());
        }

        let policy = self.policy;
        let user = self.record.user();
        let rollback = Rollback {
            password_hash: user.password_hash.clone(),
            salt: user.salt.clone(),
        };
        self.rollback.get_or_insert(rollback);

        let user = self.record.user_mut();
        if policy.uses_salt() && user.salt.is_none() {
            user.salt = Some(CredentialPolicy::generate_salt());
        }
        let hash = policy.hash_for(user, password)?;
        user.password_hash = Some(hash);
        self.password = Some(password.to_owned());
        Ok(())
    }

    /// Stage the confirmation. A blank value is ignored.
    pub fn set_password_confirmation(&mut self, confirmation: &str) {
        if !confirmation.trim().is_empty() {
            self.password_confirmation = Some(confirmation.to_owned());
        }
    }

    pub fn stage_password(&mut self, password: &str, confirmation: &str) -> Result<(), AuthError> {
        self.set_password(password)?;
        self.set_password_confirmation(confirmation);
        Ok(())
    }

    /// Validate the record and any staged password.
    ///
    /// On success the speculative hash is kept. On failure the previous
    /// hash and salt are restored. Staged fields are cleared in both cases.
    pub fn validate(&mut self) -> Result<(), ValidationErrors> {
        self.validate_with(ValidationErrors::new())
    }

    /// Like [`validate`](Self::validate), starting from errors already
    /// found by the caller (e.g. a uniqueness check against the store).
    pub fn validate_with(&mut self, errors: ValidationErrors) -> Result<(), ValidationErrors> {
        self.validate_pending(errors)?;
        self.accept();
        Ok(())
    }

    /// Validate without committing to the speculative hash.
    ///
    /// Failure restores the previous credentials. On success the rollback
    /// point is kept until [`accept`](Self::accept) or
    /// [`discard`](Self::discard), so a caller can still back out if the
    /// write that follows fails. Staged fields are cleared either way.
    pub(crate) fn validate_pending(
        &mut self,
        mut errors: ValidationErrors,
    ) -> Result<(), ValidationErrors> {
        let policy = self.policy;
        let config = policy.config();
        let user = self.record.user();

        require_present(
            &mut errors,
            "username",
            &user.username,
            &config.username_blank_message,
        );

        if self.password.is_some() || self.password_confirmation.is_some() {
            if let Some(password) = self.password.as_deref() {
                for message in policy.validate(user, password) {
                    errors.add("password", message);
                }
            }
            if self.password != self.password_confirmation {
                errors.add("password", config.password_mismatch_message.clone());
            }
        }

        let result = errors.into_result();
        if let Err(errors) = &result {
            debug!(username = %user.username, %errors, "user validation failed");
            self.restore();
        }
        self.password = None;
        self.password_confirmation = None;
        result
    }

    /// Keep the current credentials as the new baseline.
    pub(crate) fn accept(&mut self) {
        self.rollback = None;
    }

    /// Drop staged fields and any speculative hash without validating.
    pub fn discard(&mut self) {
        self.restore();
        self.password = None;
        self.password_confirmation = None;
    }

    fn restore(&mut self) {
        if let Some(rollback) = self.rollback.take() {
            let user = self.record.user_mut();
            user.password_hash = rollback.password_hash;
            user.salt = rollback.salt;
        }
    }

    pub fn has_privilege<S: AsRef<str>>(&self, names: &[S]) -> bool {
        self.record.has_privilege(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyConfig;
    use crate::hasher::Md5Hasher;
    use crate::policy::MinLength;

    fn policy(use_salt: bool) -> CredentialPolicy {
        CredentialPolicy::builder(PolicyConfig {
            use_salt,
            password_mismatch_message: "Passwords differ".into(),
            ..Default::default()
        })
        .hasher(Md5Hasher)
        .build()
        .unwrap()
    }

    fn alice() -> Principal {
        Principal::detached(User::new("alice"))
    }

    #[test]
    fn matching_passwords_keep_the_hash() {
        let policy = policy(false);
        let mut auth = UserAuthenticator::new(alice(), &policy);

        auth.stage_password("secret", "secret").unwrap();
        assert!(auth.validate().is_ok());

        let expected = policy.hash("secret", None).unwrap();
        assert_eq!(auth.record().user.password_hash.as_deref(), Some(expected.as_str()));
        assert_eq!(auth.password(), None);
        assert_eq!(auth.password_confirmation(), None);
    }

    #[test]
    fn hash_is_assigned_before_validation() {
        let policy = policy(false);
        let mut auth = UserAuthenticator::new(alice(), &policy);

        auth.set_password("secret").unwrap();
        assert_eq!(auth.password(), Some("secret"));
        assert_eq!(
            auth.record().user.password_hash,
            Some(policy.hash("secret", None).unwrap())
        );
    }

    #[test]
    fn mismatch_fails_and_clears_staged_fields() {
        let policy = policy(false);
        let mut record = alice();
        record.user.password_hash = Some("old-hash".into());
        let mut auth = UserAuthenticator::new(record, &policy);

        auth.stage_password("secret", "other").unwrap();
        let errors = auth.validate().unwrap_err();

        assert_eq!(errors.on("password"), ["Passwords differ"]);
        assert_eq!(auth.password(), None);
        assert_eq!(auth.password_confirmation(), None);
        assert_eq!(auth.record().user.password_hash.as_deref(), Some("old-hash"));
    }

    #[test]
    fn confirmation_alone_is_a_mismatch() {
        let policy = policy(false);
        let mut auth = UserAuthenticator::new(alice(), &policy);

        auth.set_password_confirmation("secret");
        let errors = auth.validate().unwrap_err();
        assert!(errors.contains("password"));
        assert!(auth.record().user.password_hash.is_none());
    }

    #[test]
    fn blank_password_is_a_noop() {
        let policy = policy(false);
        let mut record = alice();
        record.user.password_hash = Some("old-hash".into());
        let mut auth = UserAuthenticator::new(record, &policy);

        auth.set_password("").unwrap();
        auth.set_password("   ").unwrap();
        assert_eq!(auth.password(), None);
        assert!(auth.validate().is_ok());
        assert_eq!(auth.record().user.password_hash.as_deref(), Some("old-hash"));
    }

    #[test]
    fn blank_username_is_reported() {
        let policy = policy(false);
        let mut auth = UserAuthenticator::new(Principal::detached(User::new("")), &policy);
        let errors = auth.validate().unwrap_err();
        assert_eq!(errors.on("username"), ["Username cannot be blank"]);
    }

    #[test]
    fn salt_is_generated_and_used_when_enabled() {
        let policy = policy(true);
        let mut auth = UserAuthenticator::new(alice(), &policy);

        auth.stage_password("secret", "secret").unwrap();
        auth.validate().unwrap();

        let user = &auth.record().user;
        let salt = user.salt.as_deref().expect("salt generated");
        assert_eq!(
            user.password_hash,
            Some(policy.hash("secret", Some(salt)).unwrap())
        );
    }

    #[test]
    fn failed_validation_restores_generated_salt() {
        let policy = policy(true);
        let mut auth = UserAuthenticator::new(alice(), &policy);

        auth.stage_password("secret", "nope").unwrap();
        assert!(auth.validate().is_err());
        assert!(auth.record().user.salt.is_none());
        assert!(auth.record().user.password_hash.is_none());
    }

    #[test]
    fn policy_validators_reject_password() {
        let policy = CredentialPolicy::builder(PolicyConfig::default())
            .hasher(Md5Hasher)
            .validator(MinLength(10))
            .build()
            .unwrap();
        let mut auth = UserAuthenticator::new(alice(), &policy);

        auth.stage_password("short", "short").unwrap();
        let errors = auth.validate().unwrap_err();
        assert_eq!(
            errors.on("password"),
            ["Password must be at least 10 characters"]
        );
    }

    #[test]
    fn restaging_keeps_original_rollback_point() {
        let policy = policy(false);
        let mut record = alice();
        record.user.password_hash = Some("old-hash".into());
        let mut auth = UserAuthenticator::new(record, &policy);

        auth.set_password("first").unwrap();
        auth.set_password("second").unwrap();
        auth.discard();

        assert_eq!(auth.record().user.password_hash.as_deref(), Some("old-hash"));
        assert_eq!(auth.password(), None);
    }

    #[test]
    fn pending_validation_can_still_be_rolled_back() {
        let policy = policy(true);
        let mut record = alice();
        record.user.password_hash = Some("old-hash".into());
        let mut auth = UserAuthenticator::new(record, &policy);

        auth.stage_password("secret", "secret").unwrap();
        auth.validate_pending(ValidationErrors::new()).unwrap();
        assert_eq!(auth.password(), None);
        assert!(auth.record().user.salt.is_some());

        auth.discard();
        assert_eq!(auth.record().user.password_hash.as_deref(), Some("old-hash"));
        assert!(auth.record().user.salt.is_none());
    }

    #[test]
    fn user_without_group_has_no_privileges() {
        let policy = policy(false);
        let auth = UserAuthenticator::new(alice(), &policy);
        assert!(!auth.has_privilege(&["admin"]));
    }
}

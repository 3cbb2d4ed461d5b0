//! Validated commits of user records.
//!
//! [`AccountService::commit`] is the save boundary: it runs the
//! uniqueness check against the store plus the authenticator's own
//! validation, and only writes when both pass.

use std::sync::Arc;

use keyward_core::error::{KeywardError, KeywardResult};
use keyward_core::models::principal::Principal;
use keyward_core::models::user::{User, UserFilter};
use keyward_core::repository::UserRepository;
use keyward_core::validation::ValidationErrors;
use tracing::{debug, info};
use uuid::Uuid;

use crate::authenticator::{Authenticatable, UserAuthenticator};
use crate::policy::CredentialPolicy;

/// Account management service.
///
/// Generic over the user repository so that the auth layer has no
/// dependency on the database crate.
pub struct AccountService<U: UserRepository> {
    users: U,
    policy: Arc<CredentialPolicy>,
}

impl<U: UserRepository> AccountService<U> {
    pub fn new(users: U, policy: Arc<CredentialPolicy>) -> Self {
        Self { users, policy }
    }

    pub fn policy(&self) -> &CredentialPolicy {
        &self.policy
    }

    /// Wrap `record` in an authenticator bound to this service's policy.
    pub fn authenticator<A: Authenticatable>(&self, record: A) -> UserAuthenticator<'_, A> {
        UserAuthenticator::new(record, &self.policy)
    }

    /// Validate and persist the authenticator's record.
    ///
    /// Validation failures come back as `KeywardError::Validation` and
    /// nothing is written. If the write itself fails the record's
    /// previous credentials are restored. Staged password fields are
    /// cleared on every path.
    pub async fn commit<A>(&self, authenticator: &mut UserAuthenticator<'_, A>) -> KeywardResult<User>
    where
        A: Authenticatable + Send,
    {
        let (user_id, username) = {
            let user = authenticator.record().user();
            (user.id, user.username.clone())
        };
        let mut errors = ValidationErrors::new();

        if !username.trim().is_empty() {
            let taken = self.users.username_taken(&username, Some(user_id)).await;
            match taken {
                Ok(true) => errors.add(
                    "username",
                    self.policy.config().username_taken_message.clone(),
                ),
                Ok(false) => {}
                Err(e) => {
                    authenticator.discard();
                    return Err(e);
                }
            }
        }

        authenticator.validate_pending(errors)?;

        let saved = match self.users.save(authenticator.record().user()).await {
            Ok(saved) => saved,
            Err(e) => {
                authenticator.discard();
                return Err(self.classify_save_error(e));
            }
        };
        authenticator.accept();
        debug!(user_id = %saved.id, username = %saved.username, "user saved");
        *authenticator.record_mut().user_mut() = saved.clone();
        Ok(saved)
    }

    /// A username claimed between the uniqueness check and the write
    /// surfaces as the same field error the check would have produced.
    fn classify_save_error(&self, err: KeywardError) -> KeywardError {
        match err {
            KeywardError::AlreadyExists { entity } if entity == "user" => {
                let mut errors = ValidationErrors::new();
                errors.add(
                    "username",
                    self.policy.config().username_taken_message.clone(),
                );
                KeywardError::Validation(errors)
            }
            other => other,
        }
    }

    /// Create a user with an initial password.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirmation: &str,
        group_id: Option<Uuid>,
    ) -> KeywardResult<User> {
        let mut user = User::new(username);
        user.group_id = group_id;

        let mut authenticator = self.authenticator(Principal::detached(user));
        authenticator.stage_password(password, confirmation)?;
        let saved = self.commit(&mut authenticator).await?;
        info!(user_id = %saved.id, username = %saved.username, "user registered");
        Ok(saved)
    }

    /// Replace the password of an existing user.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        password: &str,
        confirmation: &str,
    ) -> KeywardResult<User> {
        let principal = self
            .users
            .find_one(&UserFilter::by_id(user_id))
            .await?
            .ok_or_else(|| KeywardError::NotFound {
                entity: "user".into(),
                id: user_id.to_string(),
            })?;

        let mut authenticator = self.authenticator(principal);
        authenticator.stage_password(password, confirmation)?;
        self.commit(&mut authenticator).await
    }

    /// Move a user into `group_id`, or out of any group with `None`.
    pub async fn assign_group(&self, user_id: Uuid, group_id: Option<Uuid>) -> KeywardResult<User> {
        let mut user = self.users.get_by_id(user_id).await?;
        user.group_id = group_id;
        self.users.save(&user).await
    }
}

#[cfg(test)]
mod tests {
    use keyward_core::repository::{PaginatedResult, Pagination};

    use super::*;
    use crate::config::PolicyConfig;
    use crate::hasher::Md5Hasher;

    /// User store that accepts every check but fails every write.
    struct FailingWrites {
        conflict: bool,
    }

    impl FailingWrites {
        fn write_error(&self) -> KeywardError {
            if self.conflict {
                KeywardError::AlreadyExists {
                    entity: "user".into(),
                }
            } else {
                KeywardError::Database("connection reset".into())
            }
        }
    }

    impl UserRepository for FailingWrites {
        async fn find_one(&self, _filter: &UserFilter) -> KeywardResult<Option<Principal>> {
            Ok(None)
        }

        async fn get_by_id(&self, id: Uuid) -> KeywardResult<User> {
            Err(KeywardError::NotFound {
                entity: "user".into(),
                id: id.to_string(),
            })
        }

        async fn username_taken(&self, _username: &str, _except: Option<Uuid>) -> KeywardResult<bool> {
            Ok(false)
        }

        async fn save(&self, _user: &User) -> KeywardResult<User> {
            Err(self.write_error())
        }

        async fn delete(&self, _id: Uuid) -> KeywardResult<()> {
            Ok(())
        }

        async fn list(&self, pagination: Pagination) -> KeywardResult<PaginatedResult<User>> {
            Ok(PaginatedResult {
                items: Vec::new(),
                total: 0,
                offset: pagination.offset,
                limit: pagination.limit,
            })
        }
    }

    fn service(conflict: bool) -> AccountService<FailingWrites> {
        let policy = CredentialPolicy::builder(PolicyConfig {
            use_salt: true,
            ..Default::default()
        })
        .hasher(Md5Hasher)
        .build()
        .unwrap();
        AccountService::new(FailingWrites { conflict }, Arc::new(policy))
    }

    fn existing_alice() -> Principal {
        let mut user = User::new("alice");
        user.password_hash = Some("old-hash".into());
        Principal::detached(user)
    }

    #[tokio::test]
    async fn username_claimed_during_write_is_a_validation_error() {
        let service = service(true);
        let mut auth = service.authenticator(existing_alice());
        auth.stage_password("secret", "secret").unwrap();

        let err = service.commit(&mut auth).await.unwrap_err();
        match err {
            KeywardError::Validation(errors) => {
                assert_eq!(errors.on("username"), ["Username has already been taken"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let user = &auth.record().user;
        assert_eq!(user.password_hash.as_deref(), Some("old-hash"));
        assert!(user.salt.is_none());
        assert_eq!(auth.password(), None);
    }

    #[tokio::test]
    async fn failed_write_restores_previous_credentials() {
        let service = service(false);
        let mut auth = service.authenticator(existing_alice());
        auth.stage_password("secret", "secret").unwrap();

        let err = service.commit(&mut auth).await.unwrap_err();
        assert!(matches!(err, KeywardError::Database(_)));

        let user = &auth.record().user;
        assert_eq!(user.password_hash.as_deref(), Some("old-hash"));
        assert!(user.salt.is_none());
        assert_eq!(auth.password_confirmation(), None);
    }
}

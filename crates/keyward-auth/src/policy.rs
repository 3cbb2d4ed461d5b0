//! Credential policy: how a plaintext password becomes a stored hash
//! and how a candidate password is judged acceptable.

use std::fmt;

use keyward_core::models::user::User;

use crate::config::PolicyConfig;
use crate::error::AuthError;
use crate::hasher::{Argon2Hasher, HashFunction};

/// Extra acceptance rule run on a staged password, on top of the
/// confirmation check. `Err` carries the message attached to the
/// `password` field.
pub trait PasswordValidator: Send + Sync {
    fn validate(&self, user: &User, candidate: &str) -> Result<(), String>;
}

impl<F> PasswordValidator for F
where
    F: Fn(&User, &str) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, user: &User, candidate: &str) -> Result<(), String> {
        self(user, candidate)
    }
}

/// Rejects passwords shorter than the given number of characters.
#[derive(Debug, Clone, Copy)]
pub struct MinLength(pub usize);

impl PasswordValidator for MinLength {
    fn validate(&self, _user: &User, candidate: &str) -> Result<(), String> {
        if candidate.chars().count() < self.0 {
            Err(format!("Password must be at least {} characters", self.0))
        } else {
            Ok(())
        }
    }
}

pub struct CredentialPolicy {
    config: PolicyConfig,
    hasher: Box<dyn HashFunction>,
    validators: Vec<Box<dyn PasswordValidator>>,
}

impl CredentialPolicy {
    /// Policy with the default Argon2id hasher and no extra validators.
    pub fn new(config: PolicyConfig) -> Result<Self, AuthError> {
        let hasher = Argon2Hasher::from_config(&config)?;
        Self::builder(config).hasher(hasher).build()
    }

    pub fn builder(config: PolicyConfig) -> CredentialPolicyBuilder {
        CredentialPolicyBuilder {
            config,
            hasher: None,
            validators: Vec::new(),
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn uses_salt(&self) -> bool {
        self.config.use_salt
    }

    /// Hash `password` with `salt`, prepending the pepper if configured.
    pub fn hash(&self, password: &str, salt: Option<&str>) -> Result<String, AuthError> {
        match self.config.pepper.as_deref() {
            Some(pepper) => self.hasher.hash(&format!("{pepper}{password}"), salt),
            None => self.hasher.hash(password, salt),
        }
    }

    /// Hash `password` for `user`, using its salt only when salting is
    /// enabled.
    pub fn hash_for(&self, user: &User, password: &str) -> Result<String, AuthError> {
        let salt = if self.config.use_salt {
            user.salt.as_deref()
        } else {
            None
        };
        self.hash(password, salt)
    }

    /// Whether `password` hashes to the hash stored on `user`.
    ///
    /// A user without a stored hash never matches.
    pub fn verify(&self, user: &User, password: &str) -> Result<bool, AuthError> {
        let candidate = self.hash_for(user, password)?;
        Ok(user
            .password_hash
            .as_deref()
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), candidate.as_bytes())))
    }

    /// Run every configured validator, collecting the rejection messages.
    pub fn validate(&self, user: &User, candidate: &str) -> Vec<String> {
        self.validators
            .iter()
            .filter_map(|v| v.validate(user, candidate).err())
            .collect()
    }

    /// A fresh random salt (16 bytes, hex-encoded) for a user that has
    /// none.
    pub fn generate_salt() -> String {
        let mut rng = rand::rng();
        let bytes: [u8; 16] = rand::Rng::random(&mut rng);
        hex::encode(bytes)
    }
}

impl fmt::Debug for CredentialPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPolicy")
            .field("config", &self.config)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

pub struct CredentialPolicyBuilder {
    config: PolicyConfig,
    hasher: Option<Box<dyn HashFunction>>,
    validators: Vec<Box<dyn PasswordValidator>>,
}

impl CredentialPolicyBuilder {
    pub fn hasher(mut self, hasher: impl HashFunction + 'static) -> Self {
        self.hasher = Some(Box::new(hasher));
        self
    }

    pub fn validator(mut self, validator: impl PasswordValidator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Fails with [`AuthError::HasherNotConfigured`] when no hash
    /// function was supplied.
    pub fn build(self) -> Result<CredentialPolicy, AuthError> {
        let hasher = self.hasher.ok_or(AuthError::HasherNotConfigured)?;
        Ok(CredentialPolicy {
            config: self.config,
            hasher,
            validators: self.validators,
        })
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

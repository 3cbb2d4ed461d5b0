//! Password hash functions.
//!
//! A [`HashFunction`] turns a password (and optional salt) into the
//! string stored as `password_hash`. Every implementation must be
//! deterministic: login recomputes the hash and compares it with the
//! stored value.

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};
use md5::Md5;
use sha2::{Digest, Sha256};

use crate::config::PolicyConfig;
use crate::error::AuthError;

/// Strategy used by a credential policy to hash passwords.
pub trait HashFunction: Send + Sync {
    fn hash(&self, password: &str, salt: Option<&str>) -> Result<String, AuthError>;
}

impl<F> HashFunction for F
where
    F: Fn(&str, Option<&str>) -> Result<String, AuthError> + Send + Sync,
{
    fn hash(&self, password: &str, salt: Option<&str>) -> Result<String, AuthError> {
        self(password, salt)
    }
}

/// Argon2id hasher producing PHC strings.
///
/// The salt is the per-user salt when one is given, otherwise the
/// configured site salt, so the output is a pure function of its inputs.
/// Raw salts of any length are accepted; Argon2 is fed their SHA-256
/// digest.
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
    site_salt: String,
}

impl Argon2Hasher {
    pub fn new(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
        site_salt: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::Configuration(format!("argon2 params: {e}")))?;
        let site_salt = site_salt.into();
        if site_salt.is_empty() {
            return Err(AuthError::Configuration("site salt cannot be empty".into()));
        }

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            site_salt,
        })
    }

    pub fn from_config(config: &PolicyConfig) -> Result<Self, AuthError> {
        Self::new(
            config.argon2_memory_kib,
            config.argon2_iterations,
            config.argon2_parallelism,
            config.site_salt.clone(),
        )
    }
}

impl HashFunction for Argon2Hasher {
    fn hash(&self, password: &str, salt: Option<&str>) -> Result<String, AuthError> {
        let salt = derive_salt(salt.unwrap_or(&self.site_salt))?;
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))?;
        Ok(hash.to_string())
    }
}

/// Fixed-length Argon2 salt for an arbitrary stored salt.
fn derive_salt(raw: &str) -> Result<SaltString, AuthError> {
    let digest = Sha256::digest(raw.as_bytes());
    SaltString::encode_b64(&digest).map_err(|e| AuthError::Crypto(format!("invalid salt: {e}")))
}

/// Hex MD5 of the password alone; any salt is ignored.
///
/// Matches the hashes written by the previous generation of this login
/// system, so existing `password_hash` values keep verifying. MD5 is
/// fast and broken: use it only to read legacy stores, never for new
/// password data. Prefer [`Argon2Hasher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hasher;

impl HashFunction for Md5Hasher {
    fn hash(&self, password: &str, _salt: Option<&str>) -> Result<String, AuthError> {
        Ok(hex::encode(Md5::digest(password.as_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cheap parameters keep the suite fast.
    fn argon2() -> Argon2Hasher {
        Argon2Hasher::new(1024, 1, 1, "unit-test-salt").unwrap()
    }

    #[test]
    fn argon2_is_deterministic() {
        let hasher = argon2();
        let a = hasher.hash("secret", Some("per-user-salt")).unwrap();
        let b = hasher.hash("secret", Some("per-user-salt")).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("$argon2id$"));
    }

    #[test]
    fn argon2_salt_changes_output() {
        let hasher = argon2();
        let salted = hasher.hash("secret", Some("per-user-salt")).unwrap();
        let site = hasher.hash("secret", None).unwrap();
        assert_ne!(salted, site);
        assert_eq!(site, hasher.hash("secret", None).unwrap());
    }

    #[test]
    fn argon2_rejects_bad_params() {
        assert!(matches!(
            Argon2Hasher::new(1, 0, 1, "unit-test-salt"),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn argon2_rejects_empty_site_salt() {
        assert!(matches!(
            Argon2Hasher::new(1024, 1, 1, ""),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn argon2_accepts_salts_of_any_length() {
        let hasher = Argon2Hasher::new(1024, 1, 1, "ab").unwrap();
        let long_salt = "x".repeat(200);

        let short = hasher.hash("secret", None).unwrap();
        let long = hasher.hash("secret", Some(&long_salt)).unwrap();
        assert_ne!(short, long);
        assert_eq!(long, hasher.hash("secret", Some(&long_salt)).unwrap());
    }

    #[test]
    fn md5_matches_legacy_hashes() {
        assert_eq!(
            Md5Hasher.hash("secret", None).unwrap(),
            "5ebe2294ecd0e0f08eab7690d2a6ee69"
        );
        assert_eq!(
            Md5Hasher.hash("secret", Some("per-user-salt")).unwrap(),
            Md5Hasher.hash("secret", None).unwrap()
        );
    }

    #[test]
    fn closures_are_hash_functions() {
        let reverse = |password: &str, _salt: Option<&str>| -> Result<String, AuthError> {
            Ok(password.chars().rev().collect())
        };
        assert_eq!(reverse.hash("abc", None).unwrap(), "cba");
    }
}

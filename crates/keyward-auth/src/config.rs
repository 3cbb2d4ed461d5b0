//! Credential policy configuration.

use serde::Deserialize;

/// Immutable configuration handed to a [`CredentialPolicy`] at
/// construction.
///
/// [`CredentialPolicy`]: crate::policy::CredentialPolicy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Hash with the per-user salt stored on the user record.
    pub use_salt: bool,
    /// Attached to `password` when password and confirmation differ.
    pub password_mismatch_message: String,
    /// Attached to `username` when it is blank.
    pub username_blank_message: String,
    /// Attached to `username` when another user already holds it.
    pub username_taken_message: String,
    /// Argon2 memory cost in KiB (default: 19456 = 19 MiB).
    pub argon2_memory_kib: u32,
    /// Argon2 iterations (default: 2).
    pub argon2_iterations: u32,
    /// Argon2 lanes (default: 1).
    pub argon2_parallelism: u32,
    /// Salt used by the Argon2 hasher when per-user salting is off.
    pub site_salt: String,
    /// Optional pepper prepended to passwords before hashing.
    pub pepper: Option<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            use_salt: false,
            password_mismatch_message: "Passwords must match".into(),
            username_blank_message: "Username cannot be blank".into(),
            username_taken_message: "Username has already been taken".into(),
            argon2_memory_kib: 19456,
            argon2_iterations: 2,
            argon2_parallelism: 1,
            site_salt: "keyward-site-salt".into(),
            pepper: None,
        }
    }
}

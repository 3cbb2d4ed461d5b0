//! Keyward Auth — credential policy, password staging, login and
//! privilege checks.

pub mod account;
pub mod authenticator;
pub mod config;
pub mod context;
pub mod error;
pub mod hasher;
pub mod login;
pub mod policy;
pub mod privilege;

pub use account::AccountService;
pub use authenticator::{Authenticatable, UserAuthenticator};
pub use config::PolicyConfig;
pub use context::CurrentUser;
pub use error::AuthError;
pub use hasher::{Argon2Hasher, HashFunction, Md5Hasher};
pub use login::{LoginParams, LoginService};
pub use policy::{CredentialPolicy, CredentialPolicyBuilder, MinLength, PasswordValidator};

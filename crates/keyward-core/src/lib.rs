//! Keyward Core — domain models, validation errors and repository
//! traits shared by the auth and storage crates.

pub mod error;
pub mod models;
pub mod repository;
pub mod validation;

pub use error::{KeywardError, KeywardResult};
pub use validation::ValidationErrors;

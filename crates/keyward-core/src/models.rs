//! Domain models for Keyward.

pub mod group;
pub mod principal;
pub mod privilege;
pub mod user;

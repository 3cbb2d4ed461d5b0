//! Field-level validation errors.
//!
//! Validation failures are collected per field before a record is
//! written. A non-empty [`ValidationErrors`] blocks the write.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Mapping from field name to the messages attached to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `message` to `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Messages attached to `field` (empty when the field is valid).
    pub fn on(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total number of messages across all fields.
    pub fn len(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// Move every message from `other` into `self`.
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Record `message` on `field` when `value` is empty or whitespace.
pub fn require_present(errors: &mut ValidationErrors, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.add(field, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_errors_are_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn messages_are_grouped_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add("password", "Passwords must match");
        errors.add("password", "too short");
        errors.add("username", "Username cannot be blank");

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.on("password").len(), 2);
        assert!(errors.on("group").is_empty());
        assert_eq!(
            errors.to_string(),
            "password: Passwords must match; password: too short; \
             username: Username cannot be blank"
        );
    }

    #[test]
    fn merge_appends_messages() {
        let mut a = ValidationErrors::new();
        a.add("username", "taken");
        let mut b = ValidationErrors::new();
        b.add("username", "blank");
        b.add("password", "mismatch");

        a.merge(b);
        assert_eq!(a.on("username"), ["taken", "blank"]);
        assert!(a.contains("password"));
    }

    #[test]
    fn whitespace_is_not_present() {
        let mut errors = ValidationErrors::new();
        require_present(&mut errors, "name", "   ", "Name cannot be blank");
        require_present(&mut errors, "other", "x", "unused");
        assert_eq!(errors.on("name"), ["Name cannot be blank"]);
        assert!(!errors.contains("other"));
    }

    #[test]
    fn serializes_as_field_map() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "Name cannot be blank");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "name": ["Name cannot be blank"] }));
    }
}

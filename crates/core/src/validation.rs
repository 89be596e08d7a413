//! Structured per-field validation failures.
//!
//! This is the body of an HTTP 422 response:
//! `{"message": "...", "errors": {"field": ["first", "second"]}}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Message used when a payload fails validation.
pub const DEFAULT_VALIDATION_MESSAGE: &str = "The given data was invalid.";

/// Per-field validation messages plus a summary message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub message: String,
    #[serde(default)]
    pub errors: BTreeMap<String, Vec<String>>,
}

impl Default for ValidationErrors {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self {
            message: DEFAULT_VALIDATION_MESSAGE.to_string(),
            errors: BTreeMap::new(),
        }
    }

    /// Record a message for `field`. Messages keep insertion order per field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(message.into());
    }

    /// Builder-style [`ValidationErrors::add`].
    pub fn with(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.add(field, message);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// First message recorded for `field`, if any.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.errors.get(field).and_then(|m| m.first()).map(String::as_str)
    }

    /// The first message of every field that has one.
    pub fn first_messages(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors
            .iter()
            .filter_map(|(field, messages)| Some((field.as_str(), messages.first()?.as_str())))
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

//! Error types for school-cms

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Validation messages keyed by form field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    /// Fold another set of errors in, prefixing each field name
    pub fn merge_prefixed(&mut self, prefix: &str, other: FieldErrors) {
        for (field, messages) in other.0 {
            let key = format!("{}.{}", prefix, field);
            self.0.entry(key).or_default().extend(messages);
        }
    }

    /// All messages moved under a single field name
    pub fn rekey(self, field: &str) -> FieldErrors {
        let mut rekeyed = FieldErrors::new();
        for messages in self.0.into_values() {
            for message in messages {
                rekeyed.add(field, message);
            }
        }
        rekeyed
    }

    /// `Ok(())` when empty, otherwise a validation error carrying these messages
    pub fn into_result(self) -> Result<(), CmsError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CmsError::Validation(self))
        }
    }

    /// Single-field shorthand
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Blob storage error: {0}")]
    Blob(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CmsError {
    /// Single-field validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        CmsError::Validation(FieldErrors::single(field, message))
    }

    /// True for failures of the database or blob collaborators
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            CmsError::Io(_) | CmsError::Database(_) | CmsError::Blob(_) | CmsError::Internal(_)
        )
    }
}

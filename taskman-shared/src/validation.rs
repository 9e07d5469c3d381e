/// Field-level validation errors
///
/// Every create/update path collects its problems into a [`ValidationErrors`] list
/// before anything is written, so callers get all failing fields at once.
///
/// # Example
///
/// ```
/// use taskman_shared::validation::ValidationErrors;
///
/// let mut errors = ValidationErrors::new();
/// errors.add("name", "can't be blank");
///
/// assert!(errors.has_field("name"));
/// assert!(errors.into_result().is_err());
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason used when a value is missing or blank
pub const BLANK: &str = "can't be blank";

/// Reason used when a value is outside an enumerated set
pub const NOT_INCLUDED: &str = "is not included in the list";

/// Longest value a short text column holds, in characters
pub const MAX_LENGTH: usize = 255;

/// Reason used when a value is longer than `max` characters
pub fn too_long(max: usize) -> String {
    format!("is too long (maximum is {max} characters)")
}

/// Whether `value` is longer than `max` characters
pub fn exceeds(value: &str, max: usize) -> bool {
    value.chars().count() > max
}

/// A single failing field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field (nested fields use dots, e.g. `attachment.file_name`)
    pub field: String,

    /// Human-readable reason
    pub reason: String,
}

/// Ordered collection of field errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Creates an empty error list
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a list holding one error
    pub fn single(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, reason);
        errors
    }

    /// Appends an error
    pub fn add(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            reason: reason.into(),
        });
    }

    /// Drops any existing errors for `field` and records `reason` instead
    pub fn replace(&mut self, field: &str, reason: impl Into<String>) {
        self.0.retain(|e| e.field != field);
        self.add(field, reason);
    }

    /// Appends all errors from `other`
    pub fn merge(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether any error names `field`
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// Reasons recorded for `field`, in insertion order
    pub fn reasons_for(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.reason.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.0
    }

    /// `Ok(())` when empty, otherwise `Err(self)`
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{} {}", e.field, e.reason))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Converts `validator` derive output, ordering fields by name for stable output
impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = Self::new();
        for (field, field_errors) in fields {
            for error in field_errors.iter() {
                let reason = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                out.add(field.to_string(), reason);
            }
        }
        out
    }
}

//! Validation error shared across the workspace.

use thiserror::Error;

/// Result type for validation checks.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Invalid caller input: a bad pagination parameter, year filter or record.
///
/// The `field` names the offending input so the edge can produce a
/// field-specific message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation error for field '{field}': {message}")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: &'static str,
    /// Human-readable description of the problem.
    pub message: String,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

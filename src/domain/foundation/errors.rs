//! Errors raised when building domain values from untrusted input.

use thiserror::Error;

/// A token claim, request field or wire name failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be blank")]
    Blank { field: &'static str },

    #[error("'{value}' is not a known {field}")]
    Unrecognized { field: &'static str, value: String },
}

impl ValidationError {
    pub fn blank(field: &'static str) -> Self {
        ValidationError::Blank { field }
    }

    /// `value` did not match any name in the closed set `field` draws from.
    pub fn unrecognized(field: &'static str, value: impl Into<String>) -> Self {
        ValidationError::Unrecognized {
            field,
            value: value.into(),
        }
    }
}

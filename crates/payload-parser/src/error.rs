//! Parse Error Types

use thiserror::Error;

/// Errors rejecting a raw payload
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The payload is not syntactically valid for any supported shape
    #[error("Malformed payload: {0}")]
    MalformedSyntax(String),

    /// A required field is absent
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A field is present but its value cannot be interpreted
    #[error("Invalid value in field {field}: {detail}")]
    InvalidValue { field: String, detail: String },
}

impl ParseError {
    pub(crate) fn missing(field: &str) -> Self {
        Self::MissingField(field.to_string())
    }

    pub(crate) fn invalid(field: &str, detail: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            detail: detail.into(),
        }
    }
}

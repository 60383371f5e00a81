//! Error types for the value crate.

use crate::value::ValueKind;
use thiserror::Error;

/// Result type for value operations.
pub type ValueResult<T> = Result<T, ValueError>;

/// Errors raised while reading host values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A value had a different shape than the caller required.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Shape the caller asked for.
        expected: ValueKind,
        /// Shape that was actually present.
        found: ValueKind,
    },

    /// An array was shorter than required.
    #[error("expected at least {expected} elements, found {found}")]
    MissingElement {
        /// Minimum element count.
        expected: usize,
        /// Actual element count.
        found: usize,
    },

    /// Failed to decode JSON text.
    #[error("invalid JSON: {message}")]
    Json {
        /// Parser message.
        message: String,
    },
}

impl ValueError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: ValueKind, found: ValueKind) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Creates a JSON decoding error.
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ValueError {
    fn from(err: serde_json::Error) -> Self {
        Self::json(err.to_string())
    }
}

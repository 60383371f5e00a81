//! Error types for PithDB core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in PithDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The SQLite engine reported a failure.
    #[error("{} - sqlite error {} ({})", .description, render_code(.code), .message)]
    Engine {
        /// What the core was attempting.
        description: String,
        /// Extended result code, when the failure came from SQLite itself.
        code: Option<i32>,
        /// The engine's own message.
        message: String,
    },

    /// The caller broke the contract of an operation.
    #[error("{description}")]
    ContractViolation {
        /// Description of the violation.
        description: String,
    },

    /// Persisted state disagrees with what the caller computed against.
    #[error("consistency failure: {description}")]
    ConsistencyFailure {
        /// Description of the mismatch.
        description: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// A host value had the wrong shape.
    #[error("value error: {0}")]
    Value(#[from] pith_value::ValueError),
}

fn render_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "?".to_string(), |c| c.to_string())
}

impl CoreError {
    /// Creates an engine error from a SQLite failure.
    ///
    /// The error is logged before it is returned so the original cause
    /// survives even if a later handler replaces it.
    pub fn engine(description: impl Into<String>, err: &rusqlite::Error) -> Self {
        let (code, message) = match err {
            rusqlite::Error::SqliteFailure(failure, message) => (
                Some(failure.extended_code),
                message.clone().unwrap_or_else(|| failure.to_string()),
            ),
            other => (None, other.to_string()),
        };
        let error = Self::Engine {
            description: description.into(),
            code,
            message,
        };
        tracing::error!("{error}");
        error
    }

    /// Creates a contract violation error.
    pub fn contract_violation(description: impl Into<String>) -> Self {
        Self::ContractViolation {
            description: description.into(),
        }
    }

    /// Creates a consistency failure error.
    ///
    /// These indicate a logic error on the caller's side; they are logged
    /// at error level.
    pub fn consistency_failure(description: impl Into<String>) -> Self {
        let error = Self::ConsistencyFailure {
            description: description.into(),
        };
        tracing::error!("{error}");
        error
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the extended engine result code, if any.
    #[must_use]
    pub fn engine_code(&self) -> Option<i32> {
        match self {
            Self::Engine { code, .. } => *code,
            _ => None,
        }
    }

    /// Returns true for failures surfaced by the engine.
    #[must_use]
    pub fn is_engine(&self) -> bool {
        matches!(self, Self::Engine { .. })
    }

    /// Returns true for contract violations, including host value shape errors.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation { .. } | Self::Value(_))
    }

    /// Returns true for consistency failures.
    #[must_use]
    pub fn is_consistency_failure(&self) -> bool {
        matches!(self, Self::ConsistencyFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    #[test]
    fn engine_error_carries_extended_code() {
        let failure = rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_CONSTRAINT_PRIMARYKEY),
            Some("UNIQUE constraint failed: notes.id".to_string()),
        );
        let err = CoreError::engine("Failed to execute db update", &failure);

        assert!(err.is_engine());
        assert_eq!(err.engine_code(), Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY));
        assert_eq!(
            err.to_string(),
            "Failed to execute db update - sqlite error 1555 (UNIQUE constraint failed: notes.id)"
        );
    }

    #[test]
    fn non_sqlite_failures_have_no_code() {
        let err = CoreError::engine("Failed to get a row for query", &rusqlite::Error::InvalidQuery);
        assert_eq!(err.engine_code(), None);
        assert!(err.to_string().contains("sqlite error ?"));
    }

    #[test]
    fn classification() {
        assert!(CoreError::contract_violation("bad").is_contract_violation());
        assert!(CoreError::consistency_failure("stale").is_consistency_failure());
        assert!(!CoreError::invalid_operation("closed").is_engine());
    }

    #[test]
    fn value_shape_errors_are_contract_violations() {
        let shape = pith_value::Value::Null.expect_text().unwrap_err();
        let err = CoreError::from(shape);

        assert!(err.is_contract_violation());
        assert!(!err.is_engine());
        assert_eq!(err.engine_code(), None);
    }
}

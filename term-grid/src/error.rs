//! Error types for the term-grid rule-evaluation engine.
//!
//! Only errors that stop an operation before it starts live here. Faults that
//! happen while rows are being evaluated (a panicking predicate, a regex that
//! runs out of time on one cell, a batch that hits its deadline) are absorbed
//! into the result structures instead and never surface as `EngineError`.

use thiserror::Error;

/// The main error type for the term-grid engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A rule, constraint, criterion or configuration value is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A rule or constraint names a column that is not in the schema.
    #[error("Column '{column}' not found in schema")]
    ColumnNotFound { column: String },

    /// The operation was invoked before the engine had anything to work on.
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// Another bulk operation is already in flight on this engine.
    #[error("Engine busy: cannot start {operation} while another operation is running")]
    Busy { operation: String },

    /// The engine has been disposed and accepts no further operations.
    #[error("Engine has been disposed")]
    Disposed,

    /// A user-supplied regular expression was rejected.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A type alias for `Result<T, EngineError>`.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a column-not-found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Creates a busy error for the named operation kind.
    pub fn busy(operation: impl Into<String>) -> Self {
        Self::Busy {
            operation: operation.into(),
        }
    }

    /// Returns true for errors raised by validating inputs up front.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::ColumnNotFound { .. } | Self::InvalidPattern(_)
        )
    }
}

impl From<regex::Error> for EngineError {
    fn from(err: regex::Error) -> Self {
        Self::InvalidPattern(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

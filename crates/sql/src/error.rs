//! Error types for expression resolution and SQL regeneration

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised during type resolution or text rebuild. All of them are
/// terminal for the statement: a tree that fails resolution is abandoned
/// wholesale by the statement layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Invalid data type: {0}")]
    InvalidDataType(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Illegal parameter for {function}: {reason}")]
    IllegalParameter { function: String, reason: String },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported cast from {from} to {to}")]
    UnsupportedCast { from: String, to: String },

    #[error("CASE branches disagree: {first} vs {second}")]
    CaseTypeMismatch { first: String, second: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for the most common mismatch shape.
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl std::fmt::Display) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    pub(crate) fn illegal(function: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::IllegalParameter {
            function: function.into(),
            reason: reason.into(),
        }
    }
}

//! Store error module.
//!
//! This module defines the errors returned by the structure registry and by
//! the probabilistic structures themselves. None of them is fatal: a failed
//! operation leaves every instance exactly as it was.

use crate::store::InstanceKind;
use thiserror::Error;

/// Errors that can occur while operating on named structures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A create call named an instance that already exists.
    #[error("Instance already exists: {0}")]
    AlreadyExists(String),

    /// The named instance does not exist.
    #[error("Instance not found: {0}")]
    NotFound(String),

    /// The operation does not apply to the instance's type.
    #[error("Instance {name} holds a {actual}, operation requires a {expected}")]
    TypeMismatch {
        /// Name of the addressed instance
        name: String,
        /// Type the operation works on
        expected: InstanceKind,
        /// Type actually stored under the name
        actual: InstanceKind,
    },

    /// Creation or operation parameters are out of range.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// A non-scaling Bloom filter has no room left.
    #[error("Bloom filter {0} is full and does not scale")]
    CapacityExceeded(String),
}

impl StoreError {
    /// Short machine-readable name of the error kind, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyExists(_) => "already_exists",
            Self::NotFound(_) => "not_found",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::InvalidParameters(_) => "invalid_parameters",
            Self::CapacityExceeded(_) => "capacity_exceeded",
        }
    }

    /// Shorthand for an `InvalidParameters` error.
    pub(crate) fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidParameters(message.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::NotFound("words".to_string());
        assert_eq!(err.to_string(), "Instance not found: words");

        let err = StoreError::TypeMismatch {
            name: "words".to_string(),
            expected: InstanceKind::CountMin,
            actual: InstanceKind::Bloom,
        };
        assert_eq!(
            err.to_string(),
            "Instance words holds a bloom, operation requires a cms"
        );
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(StoreError::invalid("x").kind(), "invalid_parameters");
        assert_eq!(
            StoreError::AlreadyExists("a".to_string()).kind(),
            "already_exists"
        );
        assert_eq!(
            StoreError::CapacityExceeded("a".to_string()).kind(),
            "capacity_exceeded"
        );
    }
}

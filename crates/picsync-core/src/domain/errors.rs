//! Domain error types
//!
//! Errors raised by validated constructors and by the sync cycle state
//! machine.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid local path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid remote identifier (file or container id)
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// A remote file name that cannot be mapped onto a local file
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// A backup period that is not in `yyyyMM` form
    #[error("Invalid backup period: {0}")]
    InvalidPeriod(String),

    /// Invalid cycle state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidFileName("a/b.jpg".to_string());
        assert_eq!(err.to_string(), "Invalid file name: a/b.jpg");

        let err = DomainError::InvalidPeriod("2026-10".to_string());
        assert_eq!(err.to_string(), "Invalid backup period: 2026-10");

        let err = DomainError::InvalidState {
            from: "Idle".to_string(),
            to: "BackingUp".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from Idle to BackingUp"
        );
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidRemoteId("x'y".to_string());
        let err2 = DomainError::InvalidRemoteId("x'y".to_string());
        let err3 = DomainError::InvalidRemoteId("other".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }

    #[test]
    fn test_error_clone() {
        let err = DomainError::ValidationFailed("test".to_string());
        let cloned = err.clone();
        assert_eq!(err, cloned);
    }
}

use serde::{Deserialize, Serialize};

/// Machine-readable error kind, independent of transport status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    InvalidState,
    Remote,
}

/// Errors surfaced by the store boundary and the workspace components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Malformed local input, caught before any remote call
    #[error("invalid input: {0}")]
    Validation(String),
    /// Remote entity absent
    #[error("not found: {0}")]
    NotFound(String),
    /// Destination already exists
    #[error("conflict: {0}")]
    Conflict(String),
    /// Operation attempted in a state that forbids it
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Any other remote or network failure, timeouts included
    #[error("remote error: {0}")]
    Remote(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::InvalidState(_) => ErrorKind::InvalidState,
            StoreError::Remote(_) => ErrorKind::Remote,
        }
    }

    /// Human-readable message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            StoreError::Validation(m)
            | StoreError::NotFound(m)
            | StoreError::Conflict(m)
            | StoreError::InvalidState(m)
            | StoreError::Remote(m) => m,
        }
    }

    /// Collapse a not-found into a generic remote failure.
    ///
    /// Used where an absent entity means the request itself could not be
    /// honoured (e.g. a compacted revision on rollback).
    pub fn not_found_as_remote(self) -> Self {
        match self {
            StoreError::NotFound(m) => StoreError::Remote(m),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_message() {
        let err = StoreError::Conflict("destination exists".to_string());
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.message(), "destination exists");
        assert_eq!(err.to_string(), "conflict: destination exists");
    }

    #[test]
    fn not_found_collapses_to_remote() {
        let err = StoreError::NotFound("revision 3 compacted".to_string()).not_found_as_remote();
        assert_eq!(err.kind(), ErrorKind::Remote);

        let other = StoreError::Conflict("x".to_string()).not_found_as_remote();
        assert_eq!(other.kind(), ErrorKind::Conflict);
    }
}

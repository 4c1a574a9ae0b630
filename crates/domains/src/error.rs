//! # Errors
//!
//! Centralized error taxonomy. Each variant maps to one caller-visible class at
//! the transport boundary.

use thiserror::Error;

/// The primary error type for all core operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Malformed input (e.g. missing or oversized post content).
    #[error("validation error: {0}")]
    Validation(String),

    /// Bad credentials or a missing/invalid/expired token. One uniform message.
    #[error("invalid credentials")]
    AuthenticationFailed,

    /// Authenticated but lacking privilege or ownership.
    #[error("forbidden")]
    Forbidden,

    /// Unknown thread or post.
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, i64),

    /// Connection or query failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Failure inside the process that is not the store's fault (hashing, signing).
    #[error("internal service error: {0}")]
    Internal(String),
}

impl From<DirectoryError> for DomainError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Unavailable(inner) => DomainError::Storage(inner),
        }
    }
}

/// Failure reported by a storage port.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Driver, pool or query failure. Carries driver text for logs only.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A row did not have the expected shape.
    #[error("unexpected row shape: {0}")]
    Decode(String),
}

/// Transient failure while resolving role assignments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("role directory unavailable: {0}")]
    Unavailable(#[from] StorageError),
}

/// Why a token could not be issued or accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token could not be signed: {0}")]
    Signing(String),
}

/// Password hashing failure (only raised when creating digests).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("password hashing failed: {0}")]
pub struct HashError(pub String);

/// A specialized Result type for core logic.
pub type Result<T> = std::result::Result<T, DomainError>;

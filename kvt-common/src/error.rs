//! Common error types for kvt

use thiserror::Error;

/// Common result type for kvt operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the kvt crates
#[derive(Error, Debug)]
pub enum Error {
    /// Requested entity, user or session does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input is missing required data or references unknown ids
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Persistence rejected the operation or could not be reached
    #[error("Storage failure: {0}")]
    Storage(String),

    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad credentials or an invalid/expired token
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A uniqueness constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Work was cancelled before it completed
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure classification exposed to callers
///
/// Every [`Error`] maps to exactly one kind. Wrapped database and I/O errors
/// classify as [`ErrorKind::Storage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Storage,
    Auth,
    Conflict,
    Cancelled,
    Config,
    Internal,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Storage(_) | Error::Io(_) => ErrorKind::Storage,
            #[cfg(feature = "sqlx")]
            Error::Database(_) => ErrorKind::Storage,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Cancelled(_) => ErrorKind::Cancelled,
            Error::Config(_) => ErrorKind::Config,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Shorthand for a missing entity of the given kind
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        Error::NotFound(format!("{} {}", what, id))
    }
}

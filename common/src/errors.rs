//! Error types for the SMS store.
//!
//! `DbError` is the single error channel of every storage, query and list
//! operation. `RequestError` is the coarse kind a request sink receives.

use thiserror::Error;

/// Error type for database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// The engine failed to open or create the database.
    #[error("Failed to open database: {0}")]
    Open(String),

    /// The open request is blocked by another connection.
    #[error("Opening database is blocked: {0}")]
    Blocked(String),

    /// The existing database carries a schema version we cannot use.
    #[error("Unsupported schema version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    /// Requested message or list does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// More than one row answered a unique lookup, or the row returned is
    /// not the one requested.
    #[error("Ambiguous lookup: {0}")]
    Ambiguous(String),

    /// An index points at a record the store does not have.
    #[error("Index and store disagree: {0}")]
    Inconsistent(String),

    /// The delete was issued but confirming it failed. The record may or may
    /// not still exist.
    #[error("Delete could not be verified: {0}")]
    Unverified(String),

    /// Error from the libmdbx backend.
    #[error("libmdbx error: {0}")]
    Mdbx(#[from] libmdbx::Error),

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Anything else (join failures, closed channels).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Failure kind delivered to a request sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestError {
    NotFound,
    UnknownError,
    InternalError,
}

impl DbError {
    /// Maps this error onto the kind reported to the requester.
    pub fn request_error(&self) -> RequestError {
        match self {
            DbError::NotFound(_) => RequestError::NotFound,
            DbError::Ambiguous(_) | DbError::Inconsistent(_) => RequestError::UnknownError,
            _ => RequestError::InternalError,
        }
    }

    /// True for failures of opening the database itself.
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            DbError::Open(_) | DbError::Blocked(_) | DbError::Version { .. }
        )
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::NotFound => write!(f, "not_found"),
            RequestError::UnknownError => write!(f, "unknown_error"),
            RequestError::InternalError => write!(f, "internal_error"),
        }
    }
}

impl From<rkyv::rancor::Error> for DbError {
    fn from(err: rkyv::rancor::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

//! Error types for relational operations.

use common::StorageError;

/// Error type for relational operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The schema does not have exactly one primary-key column.
    MissingPrimaryKey(String),

    /// A table with the same name (compared case-insensitively) exists.
    TableAlreadyExists(String),

    /// No table metadata exists for the name at the requested revision.
    TableNotFound(String),

    /// Table metadata names a column type tag this crate does not know.
    UnsupportedType(String),

    /// A value does not have the type its column or role requires.
    TypeMismatch(String),

    /// An as-of argument could not be coerced to a revision.
    InvalidRevisionType(String),

    /// The store could not be reached or rejected the session.
    BackendUnavailable(String),

    /// Stored bytes could not be decoded.
    Encoding(String),

    /// Invalid input or parameter errors.
    InvalidInput(String),

    /// Internal errors indicating bugs or invariant violations.
    Internal(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingPrimaryKey(msg) => write!(f, "Missing primary key: {}", msg),
            Error::TableAlreadyExists(table) => write!(f, "Table already exists: {}", table),
            Error::TableNotFound(table) => write!(f, "Table not found: {}", table),
            Error::UnsupportedType(tag) => write!(f, "Unsupported type: {}", tag),
            Error::TypeMismatch(msg) => write!(f, "Type mismatch: {}", msg),
            Error::InvalidRevisionType(msg) => write!(f, "Invalid revision: {}", msg),
            Error::BackendUnavailable(msg) => write!(f, "Backend unavailable: {}", msg),
            Error::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Storage(msg) => Error::BackendUnavailable(msg),
            StorageError::Unauthenticated(msg) => Error::BackendUnavailable(msg),
            StorageError::Internal(msg) => Error::Internal(msg),
        }
    }
}

/// Result type alias for relational operations.
pub type Result<T> = std::result::Result<T, Error>;

pub mod config;
pub mod factory;
pub mod in_memory;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::BytesRange;

/// Revision bound meaning "whatever is latest when the request is served".
///
/// Backends treat a bound of `0` as "before the first write", so callers that
/// want the latest state must pass this value instead.
pub const UNBOUNDED_REVISION: u64 = u64::MAX;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }
}

/// Username and password presented to [`VersionedStorage::login`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new("opendata", "opendata")
    }
}

/// Opaque token returned by a successful login. Every storage call carries one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A bounded scan over a key range as of a revision.
#[derive(Clone, Debug)]
pub struct ScanRequest {
    pub range: BytesRange,
    /// Upper revision bound, [`UNBOUNDED_REVISION`] for the latest state.
    pub revision: u64,
    /// Maximum number of records in the page. `0` means no limit.
    pub limit: usize,
}

/// One page of scan results.
#[derive(Clone, Debug, Default)]
pub struct ScanPage {
    /// Records in ascending key order.
    pub records: Vec<Record>,
    /// The concrete revision the page was read at. Follow-up pages should be
    /// requested at this revision so that they observe the same state.
    pub revision: u64,
}

/// Error type for storage operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backend could not serve the request (network, I/O, bad request).
    Storage(String),
    /// Login was rejected, or the session token is unknown or expired.
    Unauthenticated(String),
    /// Internal errors
    Internal(String),
}

impl std::error::Error for StorageError {}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StorageError::Storage(msg) => write!(f, "Storage error: {}", msg),
            StorageError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            StorageError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A multi-version key-value store.
///
/// Every successful [`set_batch`](Self::set_batch) creates a new revision in
/// which all records of the batch become visible together. Reads take an
/// upper revision bound and observe the newest version of each key that was
/// written at or before that bound.
///
/// All operations except [`login`](Self::login) must be authorized with a
/// [`SessionToken`]. A backend returns [`StorageError::Unauthenticated`] for
/// tokens it does not recognise or that have expired.
#[async_trait]
pub trait VersionedStorage: Send + Sync {
    /// Exchanges credentials for a session token.
    async fn login(&self, credentials: &Credentials) -> StorageResult<SessionToken>;

    /// Returns the revision of the most recent write batch, `0` if none.
    async fn current_revision(&self, session: &SessionToken) -> StorageResult<u64>;

    /// Reads a single key as of `revision`.
    ///
    /// Returns `None` if the key has no version at or before the bound.
    async fn get(
        &self,
        session: &SessionToken,
        key: Bytes,
        revision: u64,
    ) -> StorageResult<Option<Record>>;

    /// Writes all records atomically and returns the new revision.
    async fn set_batch(&self, session: &SessionToken, records: Vec<Record>)
    -> StorageResult<u64>;

    /// Returns up to `request.limit` records in `request.range`, as of
    /// `request.revision`, in ascending key order.
    async fn scan(&self, session: &SessionToken, request: ScanRequest)
    -> StorageResult<ScanPage>;
}

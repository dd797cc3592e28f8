pub mod bytes;
pub mod clock;
pub mod storage;

pub use bytes::BytesRange;
pub use clock::Clock;
pub use storage::config::{InMemoryConfig, StorageConfig};
pub use storage::{
    Credentials, Record, ScanPage, ScanRequest, SessionToken, StorageError, StorageResult,
    UNBOUNDED_REVISION, VersionedStorage,
};

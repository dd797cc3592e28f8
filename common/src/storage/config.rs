//! Storage backend configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default cap on live session tokens held by the in-memory store.
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Selects and configures the versioned storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// Multi-version store held entirely in process memory.
    InMemory(InMemoryConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::InMemory(InMemoryConfig::default())
    }
}

/// Configuration for [`InMemoryVersionedStorage`](super::in_memory::InMemoryVersionedStorage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryConfig {
    /// Accounts accepted by `login`, username to password.
    #[serde(default = "default_users")]
    pub users: BTreeMap<String, String>,

    /// How long an issued session token stays valid. `None` never expires.
    #[serde(with = "humantime_serde", default)]
    pub session_ttl: Option<Duration>,

    /// Maximum number of live session tokens. Logging in beyond this evicts
    /// the oldest token.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            users: default_users(),
            session_ttl: None,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

fn default_users() -> BTreeMap<String, String> {
    BTreeMap::from([("opendata".to_string(), "opendata".to_string())])
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

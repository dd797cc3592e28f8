//! Configuration options for relational storage.

use std::time::Duration;

use common::{Credentials, StorageConfig};
use serde::{Deserialize, Serialize};

/// Default number of records fetched per page when scanning table rows.
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 1024;

/// Configuration for opening a [`KvDatabase`](crate::KvDatabase).
///
/// # Example
///
/// ```ignore
/// use relational::Config;
///
/// let config: Config = toml::from_str(r#"
///     database = "shop"
///
///     [session]
///     mode = "Cached"
///     token_ttl = "10m"
/// "#)?;
/// let db = KvDatabase::open(config).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Name of the database the tables live in.
    #[serde(default = "default_database")]
    pub database: String,

    /// Credentials used to log in to the store.
    #[serde(default)]
    pub credentials: Credentials,

    /// How session tokens are acquired and refreshed.
    #[serde(default)]
    pub session: SessionConfig,

    /// Number of rows fetched per round trip when scanning a table.
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            database: default_database(),
            credentials: Credentials::default(),
            session: SessionConfig::default(),
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }
}

fn default_database() -> String {
    "opendata".to_string()
}

fn default_scan_page_size() -> usize {
    DEFAULT_SCAN_PAGE_SIZE
}

/// Session acquisition settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub mode: SessionMode,

    /// Age after which a cached token is refreshed. Ignored in
    /// [`SessionMode::PerCall`].
    #[serde(with = "humantime_serde", default)]
    pub token_ttl: Option<Duration>,
}

/// When the client logs in to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    /// Log in before every operation.
    PerCall,
    /// Reuse a token until it expires or is rejected.
    #[default]
    Cached,
}

//! Storage factory for creating storage instances from configuration.

use std::sync::Arc;

use super::config::StorageConfig;
use super::in_memory::InMemoryVersionedStorage;
use super::{StorageResult, VersionedStorage};
use crate::clock::Clock;

/// Creates a storage instance based on the provided configuration.
///
/// This is a convenience function that uses default options. For more control,
/// use [`StorageBuilder`].
pub async fn create_storage(config: &StorageConfig) -> StorageResult<Arc<dyn VersionedStorage>> {
    StorageBuilder::new(config.clone()).build().await
}

/// Builder for creating storage instances with options that cannot be
/// expressed in configuration files.
///
/// # Example
///
/// ```rust,ignore
/// use common::storage::factory::StorageBuilder;
///
/// let storage = StorageBuilder::new(config)
///     .with_clock(Arc::new(ManualClock::new(0)))
///     .build()
///     .await?;
/// ```
pub struct StorageBuilder {
    config: StorageConfig,
    clock: Option<Arc<dyn Clock>>,
}

impl StorageBuilder {
    /// Creates a new storage builder with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            clock: None,
        }
    }

    /// Sets the clock used for session expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the storage instance.
    pub async fn build(self) -> StorageResult<Arc<dyn VersionedStorage>> {
        match &self.config {
            StorageConfig::InMemory(in_memory) => {
                let mut storage = InMemoryVersionedStorage::new(in_memory);
                if let Some(clock) = self.clock {
                    storage = storage.with_clock(clock);
                }
                tracing::debug!(users = in_memory.users.len(), "created in-memory storage");
                Ok(Arc::new(storage))
            }
        }
    }
}

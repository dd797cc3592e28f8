//! A relational database stored in a versioned key-value namespace.

use std::sync::Arc;

use async_trait::async_trait;
use common::storage::factory::create_storage;

use crate::catalog::{Database, Table, TableCreator, VersionedDatabase};
use crate::client::StoreClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{Revision, Schema, Value};
use crate::serde::key::validate_name;
use crate::session::session_provider;
use crate::storage::RelationalStorage;
use crate::table::KvTable;

/// Entry point for a query engine: a named database whose tables live in the
/// versioned store.
///
/// Lookups without a revision read the latest state and return tables that
/// accept inserts. The `*_as_of` lookups return read-only tables pinned to
/// the requested revision.
#[derive(Clone)]
pub struct KvDatabase {
    name: String,
    storage: RelationalStorage,
}

impl KvDatabase {
    pub fn new(name: impl Into<String>, storage: RelationalStorage) -> Self {
        Self {
            name: name.into(),
            storage,
        }
    }

    /// Opens the database described by `config`.
    pub async fn open(config: Config) -> Result<Self> {
        validate_name(&config.database)?;
        let storage = create_storage(&config.storage).await?;
        let sessions = session_provider(&config.session, config.credentials.clone());
        let client =
            StoreClient::new(storage, sessions).with_scan_page_size(config.scan_page_size);
        tracing::info!(database = %config.database, mode = ?config.session.mode, "opened database");
        Ok(Self::new(config.database, RelationalStorage::new(client)))
    }

    pub fn storage(&self) -> &RelationalStorage {
        &self.storage
    }

    /// Returns the revision of the most recent write, usable as an as-of
    /// value.
    pub async fn current_revision(&self) -> Result<Revision> {
        self.storage.current_revision().await
    }

    async fn lookup(&self, name: &str, revision: Revision) -> Result<Option<Arc<dyn Table>>> {
        let tables = self.storage.get_tables(&self.name, revision).await?;
        let stored_name = name.to_lowercase();
        if !tables.contains(&stored_name) {
            return Ok(None);
        }

        let schema = self.storage.get_schema(&self.name, name, revision).await?;
        let pk_index = schema.primary_key_index()?;
        Ok(Some(Arc::new(KvTable::new(
            self.storage.clone(),
            self.name.clone(),
            name,
            schema,
            pk_index,
            revision,
        ))))
    }
}

/// Converts an as-of value to a revision.
///
/// Accepts a non-negative integer or text holding one. Zero selects the
/// latest revision.
pub fn revision_from_value(as_of: &Value) -> Result<Revision> {
    match as_of {
        Value::Int64(v) => u64::try_from(*v)
            .map(Revision::new)
            .map_err(|_| Error::InvalidRevisionType(format!("negative revision {}", v))),
        Value::Text(s) => s.trim().parse::<u64>().map(Revision::new).map_err(|_| {
            Error::InvalidRevisionType(format!("'{}' is not a revision number", s))
        }),
        other => Err(Error::InvalidRevisionType(format!(
            "expected an integer, got {}",
            other.type_name()
        ))),
    }
}

#[async_trait]
impl Database for KvDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn table_insensitive(&self, name: &str) -> Result<Option<Arc<dyn Table>>> {
        self.lookup(name, Revision::LATEST).await
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        self.storage.get_tables(&self.name, Revision::LATEST).await
    }
}

#[async_trait]
impl TableCreator for KvDatabase {
    async fn create_table(&self, name: &str, schema: &Schema) -> Result<()> {
        self.storage.create_table(&self.name, name, schema).await?;
        Ok(())
    }
}

#[async_trait]
impl VersionedDatabase for KvDatabase {
    async fn table_insensitive_as_of(
        &self,
        name: &str,
        as_of: &Value,
    ) -> Result<Option<Arc<dyn Table>>> {
        let revision = revision_from_value(as_of)?;
        self.lookup(name, revision).await
    }

    async fn table_names_as_of(&self, as_of: &Value) -> Result<Vec<String>> {
        let revision = revision_from_value(as_of)?;
        self.storage.get_tables(&self.name, revision).await
    }
}

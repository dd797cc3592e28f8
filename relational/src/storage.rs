//! Relational operations over the versioned store.
//!
//! [`RelationalStorage`] is the only writer of database metadata, table
//! metadata and rows. It maps each relational operation onto key-value reads
//! and atomic batch writes using the layout in [`crate::serde::key`].

use bytes::Bytes;

use crate::client::{RecordStream, StoreClient};
use crate::error::{Error, Result};
use crate::model::{Revision, Row, Schema};
use crate::serde::key::{
    database_metadata_key, table_data_key, table_data_scan_prefix, table_metadata_key,
    validate_name,
};
use crate::serde::row::{decode_row, decode_table_list, encode_row, encode_table_list};
use crate::serde::schema::{decode_schema, encode_schema};

#[derive(Clone)]
pub struct RelationalStorage {
    client: StoreClient,
}

impl RelationalStorage {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Creates a storage backed by a fresh in-memory store.
    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        use std::sync::Arc;

        use common::Credentials;
        use common::storage::in_memory::InMemoryVersionedStorage;

        use crate::session::CachedSession;

        Self::new(StoreClient::new(
            Arc::new(InMemoryVersionedStorage::default()),
            Arc::new(CachedSession::new(Credentials::default(), None)),
        ))
    }

    /// Returns the revision of the most recent write.
    pub async fn current_revision(&self) -> Result<Revision> {
        self.client.current_revision().await
    }

    /// Registers a table and stores its schema.
    ///
    /// The database's table list and the table's schema are written in one
    /// batch, so any reader that sees the table name can also read its schema.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingPrimaryKey`] unless exactly one column is a primary key.
    /// - [`Error::TableAlreadyExists`] if the name is taken, ignoring case.
    /// - [`Error::InvalidInput`] if a name cannot be used as a key segment.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn create_table(&self, database: &str, table: &str, schema: &Schema) -> Result<Revision> {
        validate_name(database)?;
        validate_name(table)?;
        schema.primary_key_index()?;

        let stored_name = table.to_lowercase();
        let mut tables = self.get_tables(database, Revision::LATEST).await?;
        if tables.contains(&stored_name) {
            return Err(Error::TableAlreadyExists(table.to_string()));
        }
        tables.push(stored_name);

        let revision = self
            .client
            .set_batch(vec![
                (database_metadata_key(database), encode_table_list(&tables)),
                (table_metadata_key(database, table), encode_schema(schema)),
            ])
            .await?;
        tracing::debug!(database, table, %revision, "created table");
        Ok(revision)
    }

    /// Writes rows keyed by the value in column `pk_index`.
    ///
    /// All rows are written in one batch. A row whose primary key already
    /// exists replaces the stored row; within the batch the last row wins.
    ///
    /// # Errors
    ///
    /// - [`Error::TypeMismatch`] if a primary key is not an integer. Nothing
    ///   is written in that case.
    /// - [`Error::InvalidInput`] for an empty batch or a row shorter than
    ///   `pk_index`.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn insert_rows(
        &self,
        database: &str,
        table: &str,
        pk_index: usize,
        rows: Vec<Row>,
    ) -> Result<Revision> {
        if rows.is_empty() {
            return Err(Error::InvalidInput("no rows to insert".to_string()));
        }

        let entries = rows
            .iter()
            .map(|row| {
                let value = row.get(pk_index).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "row has {} values, primary key is column {}",
                        row.len(),
                        pk_index
                    ))
                })?;
                let pk = value.as_primary_key().ok_or_else(|| {
                    Error::TypeMismatch(format!(
                        "primary key must be INT64, got {}",
                        value.type_name()
                    ))
                })?;
                Ok((table_data_key(database, table, pk), encode_row(row)))
            })
            .collect::<Result<Vec<(Bytes, Bytes)>>>()?;

        let revision = self.client.set_batch(entries).await?;
        tracing::debug!(database, table, rows = rows.len(), %revision, "inserted rows");
        Ok(revision)
    }

    /// Returns a lazy cursor over the table's rows as of `revision`.
    ///
    /// A table without rows, or one that does not exist, yields no rows.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn get_rows(&self, database: &str, table: &str, revision: Revision) -> Result<RowIterator> {
        let inner = self
            .client
            .scan_prefix(table_data_scan_prefix(database, table), revision)
            .await?;
        Ok(RowIterator { inner })
    }

    /// Reads a table's schema as of `revision`.
    ///
    /// # Errors
    ///
    /// [`Error::TableNotFound`] if no schema is stored for the table.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn get_schema(&self, database: &str, table: &str, revision: Revision) -> Result<Schema> {
        match self
            .client
            .get(table_metadata_key(database, table), revision)
            .await?
        {
            Some(data) => decode_schema(&data),
            None => Err(Error::TableNotFound(table.to_string())),
        }
    }

    /// Lists the database's tables as of `revision`, in creation order.
    ///
    /// A database without tables has no metadata entry and yields an empty
    /// list.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn get_tables(&self, database: &str, revision: Revision) -> Result<Vec<String>> {
        match self
            .client
            .get(database_metadata_key(database), revision)
            .await?
        {
            Some(data) => decode_table_list(&data),
            None => Ok(Vec::new()),
        }
    }
}

/// Cursor over the rows of one table at a fixed revision.
///
/// Rows are fetched from the store page by page and decoded as they are
/// returned, ordered by the byte order of their keys.
pub struct RowIterator {
    inner: RecordStream,
}

impl RowIterator {
    /// The revision the rows are read at.
    pub fn revision(&self) -> Revision {
        self.inner.revision()
    }

    /// Returns the next row, or `None` when all rows have been returned.
    pub async fn next(&mut self) -> Result<Option<Row>> {
        match self.inner.next().await? {
            Some(record) => Ok(Some(decode_row(&record.value)?)),
            None => Ok(None),
        }
    }

    /// Reads all remaining rows into memory.
    pub async fn collect_rows(mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}

//! Capabilities a query engine uses to work with relational tables.
//!
//! The traits split a database into what it can do: list and look up tables
//! ([`Database`]), create them ([`TableCreator`]), travel back to an older
//! revision ([`VersionedDatabase`]), read them partition by partition
//! ([`Table`]) and write rows ([`InsertableTable`], [`RowInserter`]).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::model::{Row, Schema, Value};
use crate::storage::RowIterator;

/// A named collection of tables.
#[async_trait]
pub trait Database: Send + Sync {
    fn name(&self) -> &str;

    /// Looks up a table by name, ignoring case. The returned table reports
    /// the name as given. Returns `None` if no table matches.
    async fn table_insensitive(&self, name: &str) -> Result<Option<Arc<dyn Table>>>;

    /// Names of all tables, in creation order.
    async fn table_names(&self) -> Result<Vec<String>>;
}

#[async_trait]
pub trait TableCreator: Send + Sync {
    async fn create_table(&self, name: &str, schema: &Schema) -> Result<()>;
}

/// A database whose past states can be read.
///
/// `as_of` is a value supplied by the query, such as the literal in
/// `AS OF 42`. It must denote a non-negative integer revision.
#[async_trait]
pub trait VersionedDatabase: Database {
    async fn table_insensitive_as_of(
        &self,
        name: &str,
        as_of: &Value,
    ) -> Result<Option<Arc<dyn Table>>>;

    async fn table_names_as_of(&self, as_of: &Value) -> Result<Vec<String>>;
}

/// A table handle bound to one revision.
#[async_trait]
pub trait Table: Send + Sync + fmt::Display {
    fn name(&self) -> &str;

    fn schema(&self) -> &Schema;

    fn partition_count(&self) -> usize;

    async fn partitions(&self) -> Result<Box<dyn PartitionIter>>;

    async fn partition_rows(&self, partition: &Partition) -> Result<RowIterator>;

    /// Returns the write capability, if the table accepts inserts.
    fn as_insertable(&self) -> Option<&dyn InsertableTable> {
        None
    }
}

pub trait InsertableTable: Send + Sync {
    fn inserter(&self) -> Box<dyn RowInserter>;
}

/// Accepts rows for one table and writes them on [`close`](Self::close).
#[async_trait]
pub trait RowInserter: Send {
    async fn insert(&mut self, row: Row) -> Result<()>;

    /// Writes all buffered rows.
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait PartitionIter: Send {
    async fn next(&mut self) -> Result<Option<Partition>>;
}

/// Opaque identifier of a slice of a table's rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    key: Bytes,
}

impl Partition {
    pub fn new(key: impl Into<Bytes>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }
}

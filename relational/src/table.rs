//! Table handles served by [`KvDatabase`](crate::KvDatabase).

use std::fmt;

use async_trait::async_trait;

use crate::catalog::{InsertableTable, Partition, PartitionIter, RowInserter, Table};
use crate::error::{Error, Result};
use crate::model::{Revision, Row, Schema};
use crate::storage::{RelationalStorage, RowIterator};

/// Key of the only partition of a table.
const SINGLE_PARTITION: &str = "single";

/// A table in the versioned store, read as of one revision.
pub struct KvTable {
    storage: RelationalStorage,
    database: String,
    name: String,
    schema: Schema,
    pk_index: usize,
    revision: Revision,
}

impl KvTable {
    pub(crate) fn new(
        storage: RelationalStorage,
        database: impl Into<String>,
        name: impl Into<String>,
        schema: Schema,
        pk_index: usize,
        revision: Revision,
    ) -> Self {
        Self {
            storage,
            database: database.into(),
            name: name.into(),
            schema,
            pk_index,
            revision,
        }
    }

    /// The revision rows are read at. [`Revision::LATEST`] for a live table.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn primary_key_index(&self) -> usize {
        self.pk_index
    }
}

impl fmt::Display for KvTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KV_TABLE[{}]", self.name)
    }
}

#[async_trait]
impl Table for KvTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn partition_count(&self) -> usize {
        1
    }

    async fn partitions(&self) -> Result<Box<dyn PartitionIter>> {
        Ok(Box::new(SinglePartitionIter { done: false }))
    }

    async fn partition_rows(&self, _partition: &Partition) -> Result<RowIterator> {
        self.storage
            .get_rows(&self.database, &self.name, self.revision)
            .await
    }

    /// Only tables read at the latest revision accept inserts.
    fn as_insertable(&self) -> Option<&dyn InsertableTable> {
        if self.revision.is_latest() {
            Some(self)
        } else {
            None
        }
    }
}

impl InsertableTable for KvTable {
    fn inserter(&self) -> Box<dyn RowInserter> {
        Box::new(KvRowInserter {
            storage: self.storage.clone(),
            database: self.database.clone(),
            table: self.name.clone(),
            schema: self.schema.clone(),
            pk_index: self.pk_index,
            buffer: Vec::new(),
        })
    }
}

struct SinglePartitionIter {
    done: bool,
}

#[async_trait]
impl PartitionIter for SinglePartitionIter {
    async fn next(&mut self) -> Result<Option<Partition>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        Ok(Some(Partition::new(SINGLE_PARTITION)))
    }
}

/// Buffers rows and writes them in a single batch on close.
pub struct KvRowInserter {
    storage: RelationalStorage,
    database: String,
    table: String,
    schema: Schema,
    pk_index: usize,
    buffer: Vec<Row>,
}

#[async_trait]
impl RowInserter for KvRowInserter {
    async fn insert(&mut self, row: Row) -> Result<()> {
        if row.len() != self.schema.len() {
            return Err(Error::InvalidInput(format!(
                "table {} has {} columns, row has {} values",
                self.table,
                self.schema.len(),
                row.len()
            )));
        }
        for (column, value) in self.schema.columns().iter().zip(&row) {
            if !column.column_type.accepts(value) {
                return Err(Error::TypeMismatch(format!(
                    "column {} is {}, got {}",
                    column.name,
                    column.column_type,
                    value.type_name()
                )));
            }
        }
        self.buffer.push(row);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn close(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let rows = std::mem::take(&mut self.buffer);
        self.storage
            .insert_rows(&self.database, &self.table, self.pk_index, rows)
            .await?;
        Ok(())
    }
}

//! OpenData Relational - Relational tables over a versioned key-value store.
//!
//! OpenData Relational stores tables, their schemas and their rows as entries
//! in a versioned key-value namespace. Every write batch gets a revision from
//! the store, so any table can be read as it was at an earlier revision.
//!
//! # Architecture
//!
//! Each database keeps three families of keys:
//!
//! ```text
//! dbm/<database>                         list of table names
//! tm/<database>/<table>                  table schema
//! td/<database>/<table>/<primary key>    one row
//! ```
//!
//! Creating a table writes the table list and the schema in one batch.
//! Inserting writes all rows of the call in one batch, keyed by the integer
//! primary key, so re-inserting a key replaces the row.
//!
//! # Key Concepts
//!
//! - **KvDatabase**: The entry point for a query engine. Implements the
//!   [`Database`], [`TableCreator`] and [`VersionedDatabase`] capabilities.
//! - **KvTable**: A table bound to one revision. Tables read at the latest
//!   revision also accept inserts through [`InsertableTable`].
//! - **RelationalStorage**: Maps relational operations to store reads and
//!   batch writes.
//! - **StoreClient**: Talks to a [`common::VersionedStorage`], logging in as
//!   configured and paging through scans.
//!
//! # Example
//!
//! ```ignore
//! use relational::{Config, Database, KvDatabase, Schema, Column, ColumnType, TableCreator, Value};
//!
//! let db = KvDatabase::open(Config::default()).await?;
//! db.create_table("users", &Schema::new(vec![
//!     Column::new("id", ColumnType::Int64).primary_key(),
//!     Column::new("name", ColumnType::Text),
//! ])).await?;
//!
//! let users = db.table_insensitive("users").await?.unwrap();
//! let mut inserter = users.as_insertable().unwrap().inserter();
//! inserter.insert(vec![Value::Int64(1), Value::from("alice")]).await?;
//! inserter.close().await?;
//!
//! let partition = users.partitions().await?.next().await?.unwrap();
//! let mut rows = users.partition_rows(&partition).await?;
//! while let Some(row) = rows.next().await? {
//!     println!("{:?}", row);
//! }
//! ```

mod catalog;
mod client;
mod config;
mod database;
mod error;
mod model;
pub mod serde;
mod session;
mod storage;
mod table;

pub use catalog::{
    Database, InsertableTable, Partition, PartitionIter, RowInserter, Table, TableCreator,
    VersionedDatabase,
};
pub use client::{RecordStream, StoreClient};
pub use config::{Config, DEFAULT_SCAN_PAGE_SIZE, SessionConfig, SessionMode};
pub use database::{KvDatabase, revision_from_value};
pub use error::{Error, Result};
pub use model::{Column, ColumnType, Revision, Row, Schema, Value};
pub use session::{CachedSession, LoginPerCall, SessionProvider, session_provider};
pub use storage::{RelationalStorage, RowIterator};
pub use table::{KvRowInserter, KvTable};

//! Key layout of relational data in the versioned store.
//!
//! ```text
//! dbm/<database>                         list of table names
//! tm/<database>/<table>                  table schema
//! td/<database>/<table>/<primary key>    one row
//! ```
//!
//! Name segments are lower-cased so that lookups are case-insensitive. They
//! are not escaped, so names must not contain [`SEPARATOR`]; see
//! [`validate_name`].

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

pub const SEPARATOR: u8 = b'/';

const DATABASE_METADATA: &str = "dbm";
const TABLE_METADATA: &str = "tm";
const TABLE_DATA: &str = "td";

fn build(family: &str, segments: &[&str], trailing_separator: bool) -> Bytes {
    let len = family.len() + segments.iter().map(|s| s.len() + 1).sum::<usize>() + 1;
    let mut buf = BytesMut::with_capacity(len);
    buf.extend_from_slice(family.as_bytes());
    for segment in segments {
        buf.put_u8(SEPARATOR);
        buf.extend_from_slice(segment.to_lowercase().as_bytes());
    }
    if trailing_separator {
        buf.put_u8(SEPARATOR);
    }
    buf.freeze()
}

/// `dbm/<database>`
pub fn database_metadata_key(database: &str) -> Bytes {
    build(DATABASE_METADATA, &[database], false)
}

/// `tm/<database>/<table>`
pub fn table_metadata_key(database: &str, table: &str) -> Bytes {
    build(TABLE_METADATA, &[database, table], false)
}

/// `td/<database>/<table>`, a prefix of every row key of the table.
pub fn table_data_prefix(database: &str, table: &str) -> Bytes {
    build(TABLE_DATA, &[database, table], false)
}

/// `td/<database>/<table>/`, the prefix to scan for the table's rows.
///
/// Unlike [`table_data_prefix`] it does not match rows of another table whose
/// name starts with this table's name.
pub fn table_data_scan_prefix(database: &str, table: &str) -> Bytes {
    build(TABLE_DATA, &[database, table], true)
}

/// `td/<database>/<table>/<primary key>`
pub fn table_data_key(database: &str, table: &str, primary_key: i64) -> Bytes {
    build(TABLE_DATA, &[database, table, &primary_key.to_string()], false)
}

/// Checks that a database or table name can be used as a key segment.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("name must not be empty".to_string()));
    }
    if name.as_bytes().contains(&SEPARATOR) {
        return Err(Error::InvalidInput(format!(
            "name '{}' must not contain '{}'",
            name, SEPARATOR as char
        )));
    }
    Ok(())
}

//! Encodings for keys and values written to the versioned store.

pub mod key;
pub mod row;
pub mod schema;

use bytes::Bytes;
use serde::Serialize;

/// Serializes a value to JSON bytes.
///
/// Only used for types without non-string map keys, for which serde_json
/// cannot fail.
fn to_json<T: Serialize + ?Sized>(value: &T) -> Bytes {
    // serde_json only fails on non-string map keys or failing Serialize impls,
    // and the schema, row and table-list types have neither
    Bytes::from(serde_json::to_vec(value).expect("value has no non-string map keys"))
}

//! Row and table-list encoding.
//!
//! A row is a JSON array of externally tagged values in schema order, e.g.
//! `[{"Int64":1},{"Text":"a"},"Null"]`, so the logical type of every value
//! survives the round trip. The table list of a database is a JSON array of
//! names.

use bytes::Bytes;

use super::to_json;
use crate::error::{Error, Result};
use crate::model::Row;

pub fn encode_row(row: &Row) -> Bytes {
    to_json(row)
}

pub fn decode_row(data: &[u8]) -> Result<Row> {
    serde_json::from_slice(data).map_err(|e| Error::Encoding(format!("invalid row: {}", e)))
}

pub fn encode_table_list(tables: &[String]) -> Bytes {
    to_json(tables)
}

pub fn decode_table_list(data: &[u8]) -> Result<Vec<String>> {
    serde_json::from_slice(data)
        .map_err(|e| Error::Encoding(format!("invalid table list: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn should_encode_row_with_tagged_values() {
        // given
        let row = vec![Value::Int64(1), Value::from("a"), Value::Null];

        // when
        let encoded = encode_row(&row);

        // then
        assert_eq!(encoded, Bytes::from(r#"[{"Int64":1},{"Text":"a"},"Null"]"#));
        assert_eq!(decode_row(&encoded).unwrap(), row);
    }

    #[test]
    fn should_keep_timestamp_distinct_from_integer() {
        // given
        let row = vec![Value::Int64(7), Value::Timestamp(7)];

        // when
        let decoded = decode_row(&encode_row(&row)).unwrap();

        // then
        assert_eq!(decoded, row);
    }

    #[test]
    fn should_fail_to_decode_untagged_values() {
        assert!(matches!(decode_row(b"[1,\"a\"]"), Err(Error::Encoding(_))));
    }

    #[test]
    fn should_encode_table_list() {
        // given
        let tables = vec!["users".to_string(), "orders".to_string()];

        // when
        let encoded = encode_table_list(&tables);

        // then
        assert_eq!(encoded, Bytes::from(r#"["users","orders"]"#));
        assert_eq!(decode_table_list(&encoded).unwrap(), tables);
    }
}

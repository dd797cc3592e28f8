//! Table schema encoding.
//!
//! A schema is stored as a JSON array with one object per column:
//!
//! ```text
//! [{"Name":"id","Type":"INT32","Source":"users","PrimaryKey":true}, ...]
//! ```
//!
//! Column types are written as tags (see [`ColumnType::tag`]), so metadata
//! stays readable without a fixed binary layout.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::to_json;
use crate::error::{Error, Result};
use crate::model::{Column, ColumnType, Schema};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ColumnRecord {
    name: String,
    #[serde(rename = "Type")]
    type_tag: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    primary_key: bool,
}

/// Encodes a schema for the table metadata entry.
pub fn encode_schema(schema: &Schema) -> Bytes {
    let records: Vec<ColumnRecord> = schema
        .columns()
        .iter()
        .map(|c| ColumnRecord {
            name: c.name.clone(),
            type_tag: c.column_type.tag().to_string(),
            source: c.source.clone(),
            primary_key: c.primary_key,
        })
        .collect();
    to_json(&records)
}

/// Decodes a table metadata entry.
///
/// Fails with [`Error::Encoding`] on malformed bytes and with
/// [`Error::UnsupportedType`] on an unknown type tag.
pub fn decode_schema(data: &[u8]) -> Result<Schema> {
    let records: Vec<ColumnRecord> = serde_json::from_slice(data)
        .map_err(|e| Error::Encoding(format!("invalid schema: {}", e)))?;

    let columns = records
        .into_iter()
        .map(|r| -> Result<Column> {
            Ok(Column {
                column_type: ColumnType::from_tag(&r.type_tag)?,
                name: r.name,
                source: r.source,
                primary_key: r.primary_key,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Schema::new(columns))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn column_type() -> impl Strategy<Value = ColumnType> {
        prop_oneof![
            Just(ColumnType::Text),
            Just(ColumnType::Int64),
            Just(ColumnType::Timestamp),
        ]
    }

    fn schema_with_one_primary_key() -> impl Strategy<Value = Schema> {
        prop::collection::vec(("[a-zA-Z_][a-zA-Z0-9_]{0,10}", column_type(), "[a-z]{0,8}"), 1..8)
            .prop_flat_map(|cols| {
                let len = cols.len();
                (Just(cols), 0..len)
            })
            .prop_map(|(cols, pk)| {
                let columns = cols
                    .into_iter()
                    .enumerate()
                    .map(|(i, (name, ty, source))| Column {
                        name,
                        column_type: ty,
                        source,
                        primary_key: i == pk,
                    })
                    .collect();
                Schema::new(columns)
            })
    }

    proptest! {
        #[test]
        fn should_round_trip_schema(schema in schema_with_one_primary_key()) {
            let decoded = decode_schema(&encode_schema(&schema)).unwrap();

            prop_assert_eq!(decoded, schema);
        }
    }

    #[test]
    fn should_encode_columns_with_wire_field_names() {
        // given
        let schema = Schema::new(vec![
            Column::new("id", ColumnType::Int64)
                .with_source("users")
                .primary_key(),
        ]);

        // when
        let encoded = encode_schema(&schema);

        // then
        assert_eq!(
            encoded,
            Bytes::from(r#"[{"Name":"id","Type":"INT32","Source":"users","PrimaryKey":true}]"#)
        );
    }

    #[test]
    fn should_fail_on_unknown_type_tag() {
        // given
        let data = br#"[{"Name":"payload","Type":"BLOB","Source":"t","PrimaryKey":false}]"#;

        // when
        let result = decode_schema(data);

        // then
        assert_eq!(result, Err(Error::UnsupportedType("BLOB".to_string())));
    }

    #[test]
    fn should_fail_on_malformed_bytes() {
        // when
        let result = decode_schema(b"{not json");

        // then
        assert!(matches!(result, Err(Error::Encoding(_))));
    }
}

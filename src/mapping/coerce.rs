//! Column value coercers
//!
//! Each coercer resolves a column by name, checks its declared type family and
//! extracts a typed value. Integers and booleans degrade to a default on a
//! mismatch; floats and timestamps fail the row.

use crate::core::{BinlogError, BinlogResult};
use crate::types::{ColumnType, ColumnValue, Table, TableColumn};
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;

/// `YYYY-MM-DD HH:MM:SS`, with an optional fractional part for TIMESTAMP(6) columns
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Resolve a column by name to its descriptor and raw value
pub fn column_at<'a>(
    table: &'a Table,
    row: &'a [ColumnValue],
    column: &str,
) -> BinlogResult<(&'a TableColumn, &'a ColumnValue)> {
    let index = table
        .find_column(column)
        .ok_or_else(|| BinlogError::missing_column(column, &table.name))?;

    // A short row image cannot carry the column either
    let value = row
        .get(index)
        .ok_or_else(|| BinlogError::missing_column(column, &table.name))?;

    Ok((&table.columns[index], value))
}

/// Integer value of an integer-family column, 0 for anything else
///
/// Unsigned values above `i64::MAX` do not fit and also read as 0.
pub fn integer(table: &Table, row: &[ColumnValue], column: &str) -> BinlogResult<i64> {
    let (descriptor, value) = column_at(table, row, column)?;
    if !descriptor.column_type.is_integer() {
        return Ok(0);
    }

    Ok(match value {
        ColumnValue::SignedInt(v) => *v,
        ColumnValue::UnsignedInt(v) => i64::try_from(*v).unwrap_or(0),
        ColumnValue::Bool(v) => i64::from(*v),
        _ => 0,
    })
}

pub fn boolean(table: &Table, row: &[ColumnValue], column: &str) -> BinlogResult<bool> {
    Ok(integer(table, row, column)? == 1)
}

pub fn float(table: &Table, row: &[ColumnValue], column: &str) -> BinlogResult<f64> {
    let (descriptor, value) = column_at(table, row, column)?;
    if descriptor.column_type != ColumnType::Float {
        return Err(BinlogError::type_mismatch(
            column,
            "float",
            descriptor.column_type.to_string(),
        ));
    }

    match value {
        ColumnValue::Float(v) => Ok(f64::from(*v)),
        ColumnValue::Double(v) => Ok(*v),
        other => Err(BinlogError::type_mismatch(column, "float", other.kind())),
    }
}

/// Text of a column; enum columns are resolved from their 1-based ordinal
pub fn string(table: &Table, row: &[ColumnValue], column: &str) -> BinlogResult<String> {
    let (descriptor, value) = column_at(table, row, column)?;

    if descriptor.column_type == ColumnType::Enum {
        let ordinal = match value {
            ColumnValue::Null => return Ok(String::new()),
            ColumnValue::SignedInt(v) => *v,
            // out of range either way, so enum_label rejects it
            ColumnValue::UnsignedInt(v) => i64::try_from(*v).unwrap_or(i64::MAX),
            // Some providers hand over the label itself
            ColumnValue::Text(label) => return Ok(label.clone()),
            other => return Err(BinlogError::type_mismatch(column, "enum ordinal", other.kind())),
        };
        return enum_label(descriptor, ordinal);
    }

    Ok(match value {
        ColumnValue::Text(v) => v.clone(),
        ColumnValue::Bytes(v) => String::from_utf8_lossy(v).into_owned(),
        _ => String::new(),
    })
}

fn enum_label(descriptor: &TableColumn, ordinal: i64) -> BinlogResult<String> {
    // MySQL stores invalid enum values as index 0, the empty string
    if ordinal == 0 {
        return Ok(String::new());
    }

    usize::try_from(ordinal - 1)
        .ok()
        .and_then(|index| descriptor.enum_values.get(index))
        .cloned()
        .ok_or_else(|| {
            BinlogError::decode(
                &descriptor.name,
                format!(
                    "enum ordinal {} out of range for {} values",
                    ordinal,
                    descriptor.enum_values.len()
                ),
            )
        })
}

pub fn timestamp(table: &Table, row: &[ColumnValue], column: &str) -> BinlogResult<NaiveDateTime> {
    let (descriptor, value) = column_at(table, row, column)?;
    if !descriptor.column_type.is_timestamp() {
        return Err(BinlogError::type_mismatch(
            column,
            "timestamp",
            descriptor.column_type.to_string(),
        ));
    }

    let text = match value {
        ColumnValue::Text(v) => v.clone(),
        ColumnValue::Bytes(v) => String::from_utf8_lossy(v).into_owned(),
        other => return Err(BinlogError::type_mismatch(column, "timestamp", other.kind())),
    };

    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| BinlogError::decode(column, format!("{} ({:?})", e, text)))
}

/// Decode the column's text as JSON into a structured value
///
/// SQL NULL decodes as JSON `null`, so `Option<T>` targets read it as `None`.
pub fn structured<T: DeserializeOwned>(
    table: &Table,
    row: &[ColumnValue],
    column: &str,
) -> BinlogResult<T> {
    let (_, value) = column_at(table, row, column)?;
    let text = match value {
        ColumnValue::Null => "null".to_string(),
        _ => string(table, row, column)?,
    };
    serde_json::from_str(&text).map_err(|e| BinlogError::decode(column, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn table(columns: Vec<TableColumn>) -> Table {
        Table::new("watermill", "watermill_test", columns)
    }

    #[test]
    fn test_integer_widens_all_widths() {
        let t = table(vec![
            TableColumn::new("small", ColumnType::Number),
            TableColumn::new("big", ColumnType::Number),
            TableColumn::new("medium", ColumnType::MediumInt),
        ]);
        let row = vec![
            ColumnValue::SignedInt(-7),
            ColumnValue::UnsignedInt(42),
            ColumnValue::SignedInt(8_388_607),
        ];

        assert_eq!(integer(&t, &row, "small").unwrap(), -7);
        assert_eq!(integer(&t, &row, "big").unwrap(), 42);
        assert_eq!(integer(&t, &row, "medium").unwrap(), 8_388_607);
    }

    #[test]
    fn test_integer_is_permissive_on_mismatch() {
        let t = table(vec![
            TableColumn::new("name", ColumnType::String),
            TableColumn::new("missing", ColumnType::Number),
        ]);
        let row = vec![ColumnValue::from("17"), ColumnValue::Null];

        assert_eq!(integer(&t, &row, "name").unwrap(), 0);
        assert_eq!(integer(&t, &row, "missing").unwrap(), 0);
    }

    #[test]
    fn test_unsigned_above_i64_range_reads_as_zero() {
        let t = table(vec![
            TableColumn::new("huge", ColumnType::Number),
            TableColumn::new("state", ColumnType::Enum).with_enum_values(["a", "b"]),
        ]);
        let row = vec![ColumnValue::UnsignedInt(u64::MAX), ColumnValue::UnsignedInt(u64::MAX)];

        assert_eq!(integer(&t, &row, "huge").unwrap(), 0);
        assert!(matches!(
            string(&t, &row, "state"),
            Err(BinlogError::Decode { .. })
        ));
    }

    #[test]
    fn test_boolean_only_one_is_true() {
        let t = table(vec![
            TableColumn::new("a", ColumnType::Number),
            TableColumn::new("b", ColumnType::Number),
            TableColumn::new("c", ColumnType::Number),
        ]);
        let row = vec![
            ColumnValue::SignedInt(1),
            ColumnValue::SignedInt(2),
            ColumnValue::Null,
        ];

        assert!(boolean(&t, &row, "a").unwrap());
        assert!(!boolean(&t, &row, "b").unwrap());
        assert!(!boolean(&t, &row, "c").unwrap());
    }

    #[test]
    fn test_float_is_strict() {
        let t = table(vec![
            TableColumn::new("single", ColumnType::Float),
            TableColumn::new("double", ColumnType::Float),
            TableColumn::new("text", ColumnType::String),
        ]);
        let row = vec![
            ColumnValue::Float(1.5),
            ColumnValue::Double(2.25),
            ColumnValue::from("3.0"),
        ];

        assert_eq!(float(&t, &row, "single").unwrap(), 1.5);
        assert_eq!(float(&t, &row, "double").unwrap(), 2.25);
        assert!(matches!(
            float(&t, &row, "text"),
            Err(BinlogError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_enum_ordinals_are_one_based() {
        let t = table(vec![
            TableColumn::new("state", ColumnType::Enum).with_enum_values(["a", "b", "c"]),
        ]);

        assert_eq!(string(&t, &[ColumnValue::SignedInt(2)], "state").unwrap(), "b");
        assert_eq!(string(&t, &[ColumnValue::UnsignedInt(1)], "state").unwrap(), "a");
        assert_eq!(string(&t, &[ColumnValue::Null], "state").unwrap(), "");
        assert_eq!(string(&t, &[ColumnValue::SignedInt(0)], "state").unwrap(), "");
        assert!(string(&t, &[ColumnValue::SignedInt(4)], "state").is_err());
    }

    #[test]
    fn test_string_handles_text_and_bytes() {
        let t = table(vec![
            TableColumn::new("text", ColumnType::String),
            TableColumn::new("blob", ColumnType::Binary),
            TableColumn::new("number", ColumnType::String),
        ]);
        let row = vec![
            ColumnValue::from("hello"),
            ColumnValue::Bytes(b"world".to_vec()),
            ColumnValue::SignedInt(3),
        ];

        assert_eq!(string(&t, &row, "text").unwrap(), "hello");
        assert_eq!(string(&t, &row, "blob").unwrap(), "world");
        assert_eq!(string(&t, &row, "number").unwrap(), "");
    }

    #[test]
    fn test_timestamp_parsing() {
        let t = table(vec![
            TableColumn::new("created_at", ColumnType::Timestamp),
            TableColumn::new("precise", ColumnType::Datetime),
            TableColumn::new("day", ColumnType::Date),
        ]);
        let row = vec![
            ColumnValue::from("2024-01-01 00:00:00"),
            ColumnValue::from("2024-01-01 10:20:30.123456"),
            ColumnValue::from("2024-01-01"),
        ];

        let parsed = timestamp(&t, &row, "created_at").unwrap();
        assert_eq!(parsed.to_string(), "2024-01-01 00:00:00");

        let precise = timestamp(&t, &row, "precise").unwrap();
        assert_eq!(precise.and_utc().timestamp_subsec_micros(), 123_456);

        assert!(matches!(
            timestamp(&t, &row, "day"),
            Err(BinlogError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_timestamp_rejects_malformed_text() {
        let t = table(vec![TableColumn::new("created_at", ColumnType::Datetime)]);
        let row = vec![ColumnValue::from("01/01/2024")];

        assert!(matches!(
            timestamp(&t, &row, "created_at"),
            Err(BinlogError::Decode { .. })
        ));
    }

    #[test]
    fn test_structured_decodes_json_text() {
        let t = table(vec![TableColumn::new("metadata", ColumnType::Json)]);
        let row = vec![ColumnValue::from(r#"{"trace":"abc"}"#)];

        let metadata: HashMap<String, String> = structured(&t, &row, "metadata").unwrap();
        assert_eq!(metadata.get("trace").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_structured_reads_null_as_none() {
        let t = table(vec![
            TableColumn::new("sql_null", ColumnType::Json),
            TableColumn::new("json_null", ColumnType::Json),
        ]);
        let row = vec![ColumnValue::Null, ColumnValue::from("null")];

        let from_sql: Option<HashMap<String, String>> = structured(&t, &row, "sql_null").unwrap();
        let from_json: Option<HashMap<String, String>> =
            structured(&t, &row, "json_null").unwrap();
        assert_eq!(from_sql, None);
        assert_eq!(from_json, None);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let t = table(vec![TableColumn::new("uuid", ColumnType::String)]);

        assert!(matches!(
            string(&t, &[ColumnValue::from("u1")], "payload"),
            Err(BinlogError::MissingColumn { .. })
        ));
        // declared but absent from the row image
        assert!(matches!(
            string(&t, &[], "uuid"),
            Err(BinlogError::MissingColumn { .. })
        ));
    }
}

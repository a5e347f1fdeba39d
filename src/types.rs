//! Data structures for row-change events
//! Contains types for representing table metadata, raw column values and row events

use serde::{Deserialize, Serialize};

/// Declared type family of a column, as reported with each event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Number,
    MediumInt,
    Float,
    Decimal,
    Enum,
    Set,
    String,
    Binary,
    Json,
    Bit,
    Datetime,
    Timestamp,
    Date,
    Time,
    Point,
}

impl ColumnType {
    /// Integer-valued families (bit columns arrive as integers too)
    pub fn is_integer(self) -> bool {
        matches!(self, ColumnType::Number | ColumnType::MediumInt | ColumnType::Bit)
    }

    pub fn is_timestamp(self) -> bool {
        matches!(self, ColumnType::Datetime | ColumnType::Timestamp)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnType::Number => "number",
            ColumnType::MediumInt => "medium_int",
            ColumnType::Float => "float",
            ColumnType::Decimal => "decimal",
            ColumnType::Enum => "enum",
            ColumnType::Set => "set",
            ColumnType::String => "string",
            ColumnType::Binary => "binary",
            ColumnType::Json => "json",
            ColumnType::Bit => "bit",
            ColumnType::Datetime => "datetime",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Point => "point",
        };
        write!(f, "{}", name)
    }
}

/// Information about a table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Allowed values of an enum column, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl TableColumn {
    pub fn new<S: Into<String>>(name: S, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            enum_values: Vec::new(),
        }
    }

    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }
}

/// Information about a table, delivered alongside every event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub columns: Vec<TableColumn>,
}

impl Table {
    pub fn new<S: Into<String>, N: Into<String>>(
        schema: S,
        name: N,
        columns: Vec<TableColumn>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns,
        }
    }

    /// Position of a column by exact name
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// A raw column value as decoded by the stream provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    SignedInt(i64),
    UnsignedInt(u64),
    Double(f64),
    Float(f32),
    Text(String),
    Bytes(Vec<u8>),
}

impl ColumnValue {
    /// Short name of the variant, used in mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            ColumnValue::Null => "null",
            ColumnValue::Bool(_) => "bool",
            ColumnValue::SignedInt(_) => "signed integer",
            ColumnValue::UnsignedInt(_) => "unsigned integer",
            ColumnValue::Double(_) => "double",
            ColumnValue::Float(_) => "float",
            ColumnValue::Text(_) => "text",
            ColumnValue::Bytes(_) => "bytes",
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::SignedInt(value)
    }
}

impl From<u64> for ColumnValue {
    fn from(value: u64) -> Self {
        ColumnValue::UnsignedInt(value)
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        ColumnValue::Double(value)
    }
}

impl From<Vec<u8>> for ColumnValue {
    fn from(value: Vec<u8>) -> Self {
        ColumnValue::Bytes(value)
    }
}

/// One row state: a value per table column, in column order
pub type RowImage = Vec<ColumnValue>;

/// Kind of change carried by a rows event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowsAction {
    #[serde(alias = "create")]
    Insert,
    Update,
    Delete,
    /// Anything the provider reports that is not a row change
    #[serde(untagged)]
    Other(String),
}

impl std::fmt::Display for RowsAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowsAction::Insert => write!(f, "insert"),
            RowsAction::Update => write!(f, "update"),
            RowsAction::Delete => write!(f, "delete"),
            RowsAction::Other(action) => write!(f, "{}", action),
        }
    }
}

/// A committed row-change event with the metadata of its table
///
/// For inserts and deletes every row image is one change. For updates the
/// images come in (before, after) pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowsEvent {
    pub table: Table,
    pub action: RowsAction,
    #[serde(default)]
    pub rows: Vec<RowImage>,
}

impl RowsEvent {
    pub fn new(table: Table, action: RowsAction, rows: Vec<RowImage>) -> Self {
        Self {
            table,
            action,
            rows,
        }
    }
}

//! Declarative row-to-record mapping
//!
//! A [`RowMapping`] is a table of field bindings built once per record type.
//! Each binding names the destination field, the source column (taken from
//! its tag), the decode rule and a setter. Mapping a row walks the table; no
//! per-event introspection happens.

use super::coerce;
use super::tag::FieldTag;
use crate::core::BinlogResult;
use crate::types::{ColumnValue, Table};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// A destination field type with a coercer
pub trait FieldValue: Sized {
    fn from_column(table: &Table, row: &[ColumnValue], column: &str) -> BinlogResult<Self>;
}

impl FieldValue for bool {
    fn from_column(table: &Table, row: &[ColumnValue], column: &str) -> BinlogResult<Self> {
        coerce::boolean(table, row, column)
    }
}

impl FieldValue for i64 {
    fn from_column(table: &Table, row: &[ColumnValue], column: &str) -> BinlogResult<Self> {
        coerce::integer(table, row, column)
    }
}

impl FieldValue for f64 {
    fn from_column(table: &Table, row: &[ColumnValue], column: &str) -> BinlogResult<Self> {
        coerce::float(table, row, column)
    }
}

impl FieldValue for String {
    fn from_column(table: &Table, row: &[ColumnValue], column: &str) -> BinlogResult<Self> {
        coerce::string(table, row, column)
    }
}

impl FieldValue for NaiveDateTime {
    fn from_column(table: &Table, row: &[ColumnValue], column: &str) -> BinlogResult<Self> {
        coerce::timestamp(table, row, column)
    }
}

/// A structured field stored as JSON text in its column
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T: DeserializeOwned> FieldValue for Json<T> {
    fn from_column(table: &Table, row: &[ColumnValue], column: &str) -> BinlogResult<Self> {
        coerce::structured(table, row, column).map(Json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeRule {
    /// Dispatch on the field's type
    Coerce,
    /// Parse the column text as JSON into the field's type
    FromJson,
}

type Apply<T> = Box<dyn Fn(&mut T, &Table, &[ColumnValue]) -> BinlogResult<()> + Send + Sync>;

struct FieldBinding<T> {
    field: &'static str,
    column: String,
    rule: DecodeRule,
    apply: Apply<T>,
}

/// Bindings from columns to the fields of `T`
pub struct RowMapping<T> {
    bindings: Vec<FieldBinding<T>>,
}

impl<T> RowMapping<T> {
    pub fn builder() -> RowMappingBuilder<T> {
        RowMappingBuilder {
            bindings: Vec::new(),
        }
    }

    /// Source columns, in binding order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.column.as_str())
    }

    pub fn rule_for(&self, field: &str) -> Option<DecodeRule> {
        self.bindings.iter().find(|b| b.field == field).map(|b| b.rule)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<T: Default> RowMapping<T> {
    /// Populate a fresh record from one row image
    pub fn map(&self, table: &Table, row: &[ColumnValue]) -> BinlogResult<T> {
        let mut record = T::default();
        for binding in &self.bindings {
            (binding.apply)(&mut record, table, row)?;
        }
        Ok(record)
    }
}

pub struct RowMappingBuilder<T> {
    bindings: Vec<FieldBinding<T>>,
}

impl<T: 'static> RowMappingBuilder<T> {
    /// Bind `field` to the column named by `tag`
    ///
    /// A tag without a usable `column` clause leaves the field unbound.
    pub fn bind<V>(mut self, field: &'static str, tag: &str, set: fn(&mut T, V)) -> Self
    where
        V: FieldValue + DeserializeOwned + 'static,
    {
        let Some(tag) = FieldTag::parse(tag) else {
            debug!("Field {} has no column binding, skipping", field);
            return self;
        };

        let rule = if tag.from_json {
            DecodeRule::FromJson
        } else {
            DecodeRule::Coerce
        };

        let column = tag.column.clone();
        let apply: Apply<T> = match rule {
            DecodeRule::Coerce => Box::new(move |record, table, row| {
                set(record, V::from_column(table, row, &column)?);
                Ok(())
            }),
            DecodeRule::FromJson => Box::new(move |record, table, row| {
                set(record, coerce::structured::<V>(table, row, &column)?);
                Ok(())
            }),
        };

        self.bindings.push(FieldBinding {
            field,
            column: tag.column,
            rule,
            apply,
        });
        self
    }

    pub fn build(self) -> RowMapping<T> {
        RowMapping {
            bindings: self.bindings,
        }
    }
}

/// Records that can be materialised from a row image
pub trait FromRow: Default + Sized + 'static {
    /// The binding table, built once and shared
    fn mapping() -> &'static RowMapping<Self>;

    fn from_row(table: &Table, row: &[ColumnValue]) -> BinlogResult<Self> {
        Self::mapping().map(table, row)
    }
}

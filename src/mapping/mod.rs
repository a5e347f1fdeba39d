//! Field mapping from raw row images to typed records
//!
//! Bindings are declared with tags (`column:<name>[;fromJson]`), resolved once
//! per record type, and applied through the per-type coercers in [`coerce`].

pub mod coerce;
pub mod row_mapping;
pub mod tag;

pub use row_mapping::{DecodeRule, FieldValue, FromRow, Json, RowMapping, RowMappingBuilder};
pub use tag::{FieldTag, parse_tag_setting};

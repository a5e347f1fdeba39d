//! Field binding tags
//!
//! A tag is a `;`-separated list of `key[:value]` clauses, e.g.
//! `column:payload;fromJson`. Keys are case-insensitive and normalised to
//! upper case; a clause without a value maps the key to itself.

use std::collections::HashMap;

pub const COLUMN: &str = "COLUMN";
pub const FROM_JSON: &str = "FROMJSON";

/// Parse a tag into its normalised clause map
pub fn parse_tag_setting(tag: &str) -> HashMap<String, String> {
    let mut settings = HashMap::new();

    for clause in tag.split(';') {
        let mut parts = clause.splitn(2, ':');
        let key = parts.next().unwrap_or_default().trim().to_uppercase();
        if key.is_empty() {
            continue;
        }

        let value = match parts.next() {
            Some(value) => value.trim().to_string(),
            None => key.clone(),
        };
        settings.insert(key, value);
    }

    settings
}

/// The parts of a tag the field mapper acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTag {
    pub column: String,
    pub from_json: bool,
}

impl FieldTag {
    /// Returns None when the tag has no usable column binding
    pub fn parse(tag: &str) -> Option<Self> {
        let settings = parse_tag_setting(tag);
        let column = settings.get(COLUMN)?.trim();
        if column.is_empty() {
            return None;
        }

        Some(Self {
            column: column.to_string(),
            from_json: settings.contains_key(FROM_JSON),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_tag_setting() {
        let cases = [
            ("column:offset", expected(&[("COLUMN", "offset")])),
            ("column:created_at", expected(&[("COLUMN", "created_at")])),
            (
                "column:payload;fromJson",
                expected(&[("COLUMN", "payload"), ("FROMJSON", "FROMJSON")]),
            ),
        ];

        for (tag, want) in cases {
            assert_eq!(parse_tag_setting(tag), want, "tag {:?}", tag);
        }
    }

    #[test]
    fn test_parse_tag_setting_ignores_empty_clauses() {
        assert_eq!(
            parse_tag_setting(" column : uuid ;; "),
            expected(&[("COLUMN", "uuid")])
        );
        assert!(parse_tag_setting("").is_empty());
    }

    #[test]
    fn test_field_tag_requires_column() {
        assert_eq!(FieldTag::parse("fromJson"), None);
        assert_eq!(FieldTag::parse("column:"), None);
        assert_eq!(
            FieldTag::parse("column:metadata;fromJson"),
            Some(FieldTag {
                column: "metadata".to_string(),
                from_json: true,
            })
        );
    }
}

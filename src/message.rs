//! Messages delivered to topic subscribers
//!
//! [`MessageRow`] is the typed projection of one change-log row; [`Message`]
//! is the envelope handed to subscribers.

use crate::mapping::{FromRow, Json, RowMapping};
use crate::types::RowsAction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Metadata key carrying the change kind
pub const ACTION_METADATA_KEY: &str = "binlog_action";
/// Metadata key carrying the backing table
pub const TABLE_METADATA_KEY: &str = "binlog_table";

/// A message as delivered on a topic channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub uuid: String,
    #[serde(with = "payload_text")]
    pub payload: Vec<u8>,
    pub metadata: HashMap<String, String>,
}

impl Message {
    pub fn new<S: Into<String>>(uuid: S, payload: Vec<u8>) -> Self {
        Self {
            uuid: uuid.into(),
            payload,
            metadata: HashMap::new(),
        }
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// One row of a topic's change-log table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageRow {
    pub uuid: String,
    pub created_at: Option<NaiveDateTime>,
    pub payload: String,
    pub metadata: HashMap<String, String>,
}

impl FromRow for MessageRow {
    fn mapping() -> &'static RowMapping<Self> {
        static MAPPING: OnceLock<RowMapping<MessageRow>> = OnceLock::new();
        MAPPING.get_or_init(|| {
            RowMapping::builder()
                .bind("uuid", "column:uuid", |r: &mut MessageRow, v| r.uuid = v)
                .bind("created_at", "column:created_at", |r: &mut MessageRow, v| {
                    r.created_at = Some(v)
                })
                .bind("payload", "column:payload", |r: &mut MessageRow, v| r.payload = v)
                .bind(
                    "metadata",
                    "column:metadata;fromJson",
                    |r: &mut MessageRow, Json(v): Json<Option<HashMap<String, String>>>| {
                        r.metadata = v.unwrap_or_default()
                    },
                )
                .build()
        })
    }
}

impl MessageRow {
    /// Build the delivered message for a classified change
    pub fn into_message(self, action: &RowsAction, table: &str) -> Message {
        let mut metadata = self.metadata;
        metadata.insert(ACTION_METADATA_KEY.to_string(), action.to_string());
        metadata.insert(TABLE_METADATA_KEY.to_string(), table.to_string());

        Message {
            uuid: self.uuid,
            payload: self.payload.into_bytes(),
            metadata,
        }
    }
}

/// Payloads are written out as text when they are valid UTF-8
mod payload_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(payload) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => serializer.serialize_bytes(payload),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(String::deserialize(deserializer)?.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnType, ColumnValue, Table, TableColumn};

    fn messages_table() -> Table {
        Table::new(
            "watermill",
            "watermill_orders",
            vec![
                TableColumn::new("id", ColumnType::String),
                TableColumn::new("created_at", ColumnType::Timestamp),
                TableColumn::new("uuid", ColumnType::String),
                TableColumn::new("payload", ColumnType::Json),
                TableColumn::new("metadata", ColumnType::Json),
            ],
        )
    }

    #[test]
    fn test_message_row_from_row() {
        let row = vec![
            ColumnValue::from("u1"),
            ColumnValue::from("2024-01-01 00:00:00"),
            ColumnValue::from("u1"),
            ColumnValue::from("p"),
            ColumnValue::from(r#"{"source":"test"}"#),
        ];

        let record = MessageRow::from_row(&messages_table(), &row).unwrap();
        assert_eq!(record.uuid, "u1");
        assert_eq!(record.payload, "p");
        assert_eq!(
            record.created_at.map(|t| t.to_string()).as_deref(),
            Some("2024-01-01 00:00:00")
        );
        assert_eq!(record.metadata.get("source").map(String::as_str), Some("test"));
    }

    #[test]
    fn test_into_message_adds_routing_metadata() {
        let record = MessageRow {
            uuid: "u2".to_string(),
            created_at: None,
            payload: "{\"n\":1}".to_string(),
            metadata: HashMap::from([("k".to_string(), "v".to_string())]),
        };

        let message = record.into_message(&RowsAction::Insert, "watermill_orders");
        assert_eq!(message.uuid, "u2");
        assert_eq!(message.payload, b"{\"n\":1}".to_vec());
        assert_eq!(message.metadata("k"), Some("v"));
        assert_eq!(message.metadata(ACTION_METADATA_KEY), Some("insert"));
        assert_eq!(message.metadata(TABLE_METADATA_KEY), Some("watermill_orders"));
    }

    #[test]
    fn test_message_serializes_payload_as_text() {
        let message = Message::new("u3", b"hello".to_vec());
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["payload"], "hello");

        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, message);
    }
}

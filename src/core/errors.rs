//! Error types for the binlog-to-topic bridge
//! Provides structured error handling using thiserror for better error reporting

use thiserror::Error;

/// Main error type for the binlog subscriber
#[derive(Error, Debug)]
pub enum BinlogError {
    /// Topic name rejected by validation
    #[error("Invalid topic name {topic:?}: {reason}")]
    InvalidTopic { topic: String, reason: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A field mapping refers to a column the event does not carry
    #[error("Column {column:?} not found in table {table:?}")]
    MissingColumn { column: String, table: String },

    /// The declared column type or the raw value does not fit the coercer
    #[error("Type mismatch on column {column:?}: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: String,
    },

    /// A column value could not be decoded (timestamp or embedded JSON)
    #[error("Failed to decode column {column:?}: {message}")]
    Decode { column: String, message: String },

    /// Backing storage for a topic could not be created
    #[error("Schema initialization failed for topic {topic:?}: {message}")]
    SchemaInitialization { topic: String, message: String },

    /// Replication stream failures (start position, reading events)
    #[error("Replication stream error: {message}")]
    Stream { message: String },

    /// The delivery channel of a topic has no receiver left
    #[error("Delivery channel closed for table {table:?}")]
    ChannelClosed { table: String },

    /// JSON (de)serialization errors
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// Task execution errors for async operations
    #[error("Task execution error")]
    TaskExecution(#[from] tokio::task::JoinError),

    /// Generic error for compatibility
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for convenience
pub type BinlogResult<T> = std::result::Result<T, BinlogError>;

impl BinlogError {
    /// Create an invalid topic error
    pub fn invalid_topic<T: Into<String>, R: Into<String>>(topic: T, reason: R) -> Self {
        Self::InvalidTopic {
            topic: topic.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn missing_column<C: Into<String>, T: Into<String>>(column: C, table: T) -> Self {
        Self::MissingColumn {
            column: column.into(),
            table: table.into(),
        }
    }

    pub fn type_mismatch<C: Into<String>, F: Into<String>>(
        column: C,
        expected: &'static str,
        found: F,
    ) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            expected,
            found: found.into(),
        }
    }

    pub fn decode<C: Into<String>, M: Into<String>>(column: C, message: M) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn schema_init<T: Into<String>, M: Into<String>>(topic: T, message: M) -> Self {
        Self::SchemaInitialization {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create a replication stream error
    pub fn stream<S: Into<String>>(message: S) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_column() {
        let err = BinlogError::missing_column("payload", "watermill_orders");
        assert_eq!(
            err.to_string(),
            "Column \"payload\" not found in table \"watermill_orders\""
        );

        let err = BinlogError::type_mismatch("price", "float", "text");
        assert!(err.to_string().contains("expected float, found text"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: BinlogError = parse.unwrap_err().into();
        assert!(matches!(err, BinlogError::Json(_)));
    }
}

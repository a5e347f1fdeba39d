//! Configuration management for the binlog subscriber
//!
//! This module handles loading configuration from environment variables.
//! It provides a centralized way to manage all subscriber settings
//! with proper validation and default values.

use super::{BinlogError, BinlogResult};
use std::env;

/// Schema all change-log tables live in unless overridden
pub const DEFAULT_RESERVED_SCHEMA: &str = "watermill";

/// Per-topic delivery channel capacity unless overridden
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Which classified changes turn into published messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EmitPolicy {
    /// Only newly inserted rows are published
    #[default]
    Inserts,
    /// Inserts, the after image of updates and the deleted image of deletes
    AllChanges,
}

impl std::fmt::Display for EmitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmitPolicy::Inserts => write!(f, "insert"),
            EmitPolicy::AllChanges => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for EmitPolicy {
    type Err = BinlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "insert" | "inserts" | "create" => Ok(EmitPolicy::Inserts),
            "all" => Ok(EmitPolicy::AllChanges),
            _ => Err(BinlogError::config(
                "BINLOG_EMIT_ACTIONS must be one of: 'insert' or 'all'",
            )),
        }
    }
}

/// Configuration for the binlog subscriber
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Only events from this schema are considered
    pub reserved_schema: String,
    /// Create backing tables on first subscription
    pub initialize_schema: bool,
    pub channel_capacity: usize,
    pub emit: EmitPolicy,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            reserved_schema: DEFAULT_RESERVED_SCHEMA.to_string(),
            initialize_schema: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            emit: EmitPolicy::default(),
        }
    }
}

impl SubscriberConfig {
    /// Load configuration from environment variables
    ///
    /// # Environment Variables
    ///
    /// Optional (with defaults):
    /// - `BINLOG_SCHEMA`: Schema holding the change-log tables (default: "watermill")
    /// - `BINLOG_INITIALIZE_SCHEMA`: "true" or "false" (default: "false")
    /// - `BINLOG_CHANNEL_CAPACITY`: Per-topic buffer size (default: 64)
    /// - `BINLOG_EMIT_ACTIONS`: "insert" or "all" (default: "insert")
    pub fn from_env() -> BinlogResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> BinlogResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let reserved_schema =
            lookup("BINLOG_SCHEMA").unwrap_or_else(|| DEFAULT_RESERVED_SCHEMA.to_string());

        let initialize_schema = match lookup("BINLOG_INITIALIZE_SCHEMA") {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                BinlogError::config("BINLOG_INITIALIZE_SCHEMA must be 'true' or 'false'")
            })?,
            None => false,
        };

        let channel_capacity = match lookup("BINLOG_CHANNEL_CAPACITY") {
            Some(value) => value.trim().parse::<usize>().map_err(|_| {
                BinlogError::config("BINLOG_CHANNEL_CAPACITY must be a positive integer")
            })?,
            None => DEFAULT_CHANNEL_CAPACITY,
        };

        let emit = match lookup("BINLOG_EMIT_ACTIONS") {
            Some(value) => value.parse()?,
            None => EmitPolicy::default(),
        };

        let config = Self {
            reserved_schema,
            initialize_schema,
            channel_capacity,
            emit,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> BinlogResult<()> {
        if self.reserved_schema.trim().is_empty() {
            return Err(BinlogError::config("BINLOG_SCHEMA cannot be empty"));
        }

        // MySQL identifier length limit
        if self.reserved_schema.len() > 64 {
            return Err(BinlogError::config(
                "BINLOG_SCHEMA cannot be longer than 64 characters",
            ));
        }

        // tokio channels panic on a zero capacity
        if self.channel_capacity == 0 {
            return Err(BinlogError::config(
                "BINLOG_CHANNEL_CAPACITY must be a positive integer",
            ));
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

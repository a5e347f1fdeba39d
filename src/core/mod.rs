//! Core module containing fundamental types and configurations
//!
//! This module provides the basic building blocks for the binlog2topic bridge,
//! including configuration management and error handling.

pub mod config;
pub mod errors;

// Re-export for convenience
pub use config::{EmitPolicy, SubscriberConfig};
pub use errors::{BinlogError, BinlogResult};

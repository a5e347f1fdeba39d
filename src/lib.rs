//! binlog2topic: MySQL binlog rows events delivered as topic messages
//!
//! A [`BinlogSubscriber`] consumes decoded rows events from a
//! [`ReplicationStream`](replication::ReplicationStream), keeps the ones that
//! touch a subscribed topic's messages table and hands each inserted row to
//! that topic's subscribers as a [`Message`].

pub mod classifier;
pub mod core;
pub mod event_sink;
pub mod mapping;
pub mod message;
pub mod replication;
pub mod router;
pub mod schema;
pub mod subscriber;
pub mod tracing_context;
pub mod types;

pub use crate::core::{BinlogError, BinlogResult, EmitPolicy, SubscriberConfig};
pub use message::Message;
pub use router::Subscription;
pub use subscriber::{BinlogSubscriber, SubscriberBuilder};

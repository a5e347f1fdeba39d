//! Replication stream providers
//!
//! The subscriber does not speak any replication protocol itself. It is handed
//! a [`ReplicationStream`] that yields already decoded rows events together
//! with their table metadata.

pub mod channel;
pub mod json_lines;
pub mod stream;

// Re-export for convenience
pub use channel::ChannelStream;
pub use json_lines::JsonLinesStream;
pub use stream::{ReplicationStream, StreamPosition};

//! Replication stream provider interface

use crate::core::BinlogResult;
use crate::event_sink::EventSink;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A position in the replication log: log name plus offset within it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamPosition {
    pub name: String,
    pub pos: u64,
}

impl StreamPosition {
    pub fn new<S: Into<String>>(name: S, pos: u64) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }
}

impl std::fmt::Display for StreamPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.name, self.pos)
    }
}

/// Source of committed rows events
#[async_trait]
pub trait ReplicationStream: Send + 'static {
    /// Current position of the log; streaming starts here
    async fn start_position(&mut self) -> BinlogResult<StreamPosition>;

    /// Feed events from `position` into `sink` until the log ends or
    /// `shutdown` fires
    ///
    /// Events are handed over one at a time, waiting for the sink before
    /// reading the next.
    async fn run(
        self: Box<Self>,
        position: StreamPosition,
        sink: Arc<dyn EventSink>,
        shutdown: CancellationToken,
    ) -> BinlogResult<()>;
}

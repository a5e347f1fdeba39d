//! In-process replication stream fed through a tokio channel

use super::stream::{ReplicationStream, StreamPosition};
use crate::core::BinlogResult;
use crate::event_sink::EventSink;
use crate::types::RowsEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const CHANNEL_LOG_NAME: &str = "channel";

/// Stream whose events are pushed by the embedding application
pub struct ChannelStream {
    receiver: mpsc::Receiver<RowsEvent>,
}

impl ChannelStream {
    /// Create the stream together with the sender that feeds it
    pub fn new(capacity: usize) -> (mpsc::Sender<RowsEvent>, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (sender, Self { receiver })
    }
}

#[async_trait]
impl ReplicationStream for ChannelStream {
    async fn start_position(&mut self) -> BinlogResult<StreamPosition> {
        Ok(StreamPosition::new(CHANNEL_LOG_NAME, 0))
    }

    async fn run(
        mut self: Box<Self>,
        position: StreamPosition,
        sink: Arc<dyn EventSink>,
        shutdown: CancellationToken,
    ) -> BinlogResult<()> {
        info!("Channel stream started at {}", position);
        let mut handled: u64 = 0;

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = self.receiver.recv() => event,
            };

            let Some(event) = event else {
                break;
            };
            handled += 1;

            if let Err(e) = sink.on_rows(&event).await {
                warn!("Sink failed on event {}: {}", handled, e);
            }
        }

        info!("Channel stream stopped after {} events", handled);
        Ok(())
    }
}

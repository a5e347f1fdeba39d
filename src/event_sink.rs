use crate::core::BinlogResult;
use crate::types::RowsEvent;
use async_trait::async_trait;

/// Receiver of rows events, installed into a replication stream
///
/// Streams call `on_rows` once per committed event, in commit order, and
/// wait for it to return before reading the next event.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn on_rows(&self, event: &RowsEvent) -> BinlogResult<()>;
}

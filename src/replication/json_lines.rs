//! Newline-delimited JSON rows events
//!
//! Each line holds one serialized [`RowsEvent`]. This is the format produced
//! by binlog tailing tools that already decode rows, and what the
//! `binlog2topic` binary reads from a file or stdin.

use super::stream::{ReplicationStream, StreamPosition};
use crate::core::{BinlogError, BinlogResult};
use crate::event_sink::EventSink;
use crate::types::RowsEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct JsonLinesStream<R> {
    name: String,
    reader: R,
}

impl<R> JsonLinesStream<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    /// `name` identifies the source in positions and logs
    pub fn new<S: Into<String>>(name: S, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
        }
    }
}

#[async_trait]
impl<R> ReplicationStream for JsonLinesStream<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn start_position(&mut self) -> BinlogResult<StreamPosition> {
        Ok(StreamPosition::new(self.name.clone(), 0))
    }

    async fn run(
        self: Box<Self>,
        position: StreamPosition,
        sink: Arc<dyn EventSink>,
        shutdown: CancellationToken,
    ) -> BinlogResult<()> {
        let JsonLinesStream { name, reader } = *self;
        info!("Reading rows events from {} at {}", name, position);

        let mut lines = reader.lines();
        let mut line_number: u64 = 0;

        loop {
            let line = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Stopping {} at line {}", name, line_number);
                    return Ok(());
                }
                line = lines.next_line() => line.map_err(|e| {
                    BinlogError::stream(format!("reading {}: {}", name, e))
                })?,
            };

            let Some(line) = line else {
                info!("Reached end of {} after {} lines", name, line_number);
                return Ok(());
            };
            line_number += 1;

            if line_number <= position.pos || line.trim().is_empty() {
                continue;
            }

            let event: RowsEvent = match serde_json::from_str(&line) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping malformed event on line {}: {}", line_number, e);
                    continue;
                }
            };

            debug!(
                "Line {}: {} on {}.{}",
                line_number, event.action, event.table.schema, event.table.name
            );
            if let Err(e) = sink.on_rows(&event).await {
                warn!("Sink failed on line {}: {}", line_number, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowsAction;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        events: Mutex<Vec<RowsEvent>>,
    }

    #[async_trait]
    impl EventSink for CollectingSink {
        async fn on_rows(&self, event: &RowsEvent) -> BinlogResult<()> {
            self.events.lock().await.push(event.clone());
            Ok(())
        }
    }

    fn line(table: &str, action: &str) -> String {
        format!(
            r#"{{"table":{{"schema":"watermill","name":"{}","columns":[]}},"action":"{}","rows":[]}}"#,
            table, action
        )
    }

    #[tokio::test]
    async fn test_reads_events_in_order_and_skips_garbage() {
        let input = [
            line("a", "insert"),
            "not json".to_string(),
            String::new(),
            line("b", "update"),
            line("c", "delete"),
        ]
        .join("\n");

        let mut stream = JsonLinesStream::new("test", std::io::Cursor::new(input));
        let position = stream.start_position().await.unwrap();
        assert_eq!(position, StreamPosition::new("test", 0));

        let sink = Arc::new(CollectingSink::default());
        Box::new(stream)
            .run(position, sink.clone(), CancellationToken::new())
            .await
            .unwrap();

        let events = sink.events.lock().await;
        let seen: Vec<(&str, &RowsAction)> = events
            .iter()
            .map(|e| (e.table.name.as_str(), &e.action))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("a", &RowsAction::Insert),
                ("b", &RowsAction::Update),
                ("c", &RowsAction::Delete)
            ]
        );
    }

    #[tokio::test]
    async fn test_resumes_after_position() {
        let input = [line("a", "insert"), line("b", "insert")].join("\n");
        let stream = JsonLinesStream::new("test", std::io::Cursor::new(input));

        let sink = Arc::new(CollectingSink::default());
        Box::new(stream)
            .run(StreamPosition::new("test", 1), sink.clone(), CancellationToken::new())
            .await
            .unwrap();

        let events = sink.events.lock().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].table.name, "b");
    }
}

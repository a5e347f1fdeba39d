//! Correlation ID and tracing context management
//!
//! Every rows event handled by the router runs inside its own span, tagged with
//! a correlation ID so the log lines of one event can be followed.

use crate::types::RowsEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tracing::Span;

/// Global counter for generating sequential correlation IDs
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A correlation ID that uniquely identifies one handled event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a new correlation ID using timestamp and counter
    pub fn new() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let counter = CORRELATION_COUNTER.fetch_add(1, Ordering::SeqCst);

        CorrelationId(format!("{}-{}", timestamp, counter))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span and correlation ID for one rows event
#[derive(Debug, Clone)]
pub struct EventContext {
    pub correlation_id: CorrelationId,
    pub span: Span,
}

impl EventContext {
    pub fn for_event(event: &RowsEvent) -> Self {
        let correlation_id = CorrelationId::new();
        let span = tracing::info_span!(
            "rows_event",
            correlation_id = %correlation_id,
            schema = %event.table.schema,
            table = %event.table.name,
            action = %event.action,
            rows = event.rows.len(),
            component = "binlog2topic"
        );

        Self {
            correlation_id,
            span,
        }
    }
}

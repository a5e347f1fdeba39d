//! Topic registry and event router
//!
//! The router owns the mapping from backing table name to delivery channel.
//! For every rows event it checks the schema and table, translates the rows
//! into messages and writes them to the table's channel in order.

use crate::classifier::classify;
use crate::core::{BinlogError, BinlogResult, EmitPolicy};
use crate::event_sink::EventSink;
use crate::message::{Message, MessageRow};
use crate::tracing_context::EventContext;
use crate::types::{RowsAction, RowsEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

/// Read side of a topic's delivery channel
///
/// Clones share the same underlying channel; concurrent readers compete for
/// messages.
#[derive(Clone, Debug)]
pub struct Subscription {
    table: String,
    receiver: Arc<Mutex<mpsc::Receiver<Message>>>,
}

impl Subscription {
    /// Next message, or None once the subscriber has been closed and the
    /// buffer drained
    pub async fn recv(&self) -> Option<Message> {
        self.receiver.lock().await.recv().await
    }

    /// Backing table this subscription reads from
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn same_channel(&self, other: &Subscription) -> bool {
        Arc::ptr_eq(&self.receiver, &other.receiver)
    }
}

struct TopicChannel {
    sender: mpsc::Sender<Message>,
    subscription: Subscription,
}

pub struct Router {
    reserved_schema: String,
    emit: EmitPolicy,
    channel_capacity: usize,
    registry: Mutex<HashMap<String, TopicChannel>>,
    shutdown: CancellationToken,
}

impl Router {
    pub fn new(
        reserved_schema: impl Into<String>,
        emit: EmitPolicy,
        channel_capacity: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            reserved_schema: reserved_schema.into(),
            emit,
            channel_capacity: channel_capacity.max(1),
            registry: Mutex::new(HashMap::new()),
            shutdown,
        }
    }

    /// Return the table's channel, creating it on first use
    ///
    /// Fails once shutdown has begun, so no channel outlives `unregister_all`.
    pub async fn register(&self, table: &str) -> BinlogResult<Subscription> {
        let mut registry = self.registry.lock().await;
        if self.shutdown.is_cancelled() {
            return Err(BinlogError::stream("subscriber is closed"));
        }
        if let Some(channel) = registry.get(table) {
            return Ok(channel.subscription.clone());
        }

        let (sender, receiver) = mpsc::channel(self.channel_capacity);
        let subscription = Subscription {
            table: table.to_string(),
            receiver: Arc::new(Mutex::new(receiver)),
        };
        registry.insert(
            table.to_string(),
            TopicChannel {
                sender,
                subscription: subscription.clone(),
            },
        );
        info!("Registered delivery channel for table {}", table);

        Ok(subscription)
    }

    pub async fn is_registered(&self, table: &str) -> bool {
        self.registry.lock().await.contains_key(table)
    }

    /// Drop every channel so readers see the end of their stream
    pub async fn unregister_all(&self) {
        let mut registry = self.registry.lock().await;
        for table in registry.keys() {
            debug!("Closing delivery channel for table {}", table);
        }
        registry.clear();
    }

    /// Translate one event and deliver its messages
    ///
    /// Never fails: events for other schemas or unregistered tables are
    /// dropped, and a fault while translating is logged and the event skipped.
    pub async fn handle_event(&self, event: &RowsEvent) {
        let context = EventContext::for_event(event);
        self.route(event).instrument(context.span).await
    }

    async fn route(&self, event: &RowsEvent) {
        if event.table.schema != self.reserved_schema {
            return;
        }

        // Release the registry before delivering so subscribe is never blocked
        // behind a full channel
        let sender = {
            let registry = self.registry.lock().await;
            match registry.get(&event.table.name) {
                Some(channel) => channel.sender.clone(),
                None => return,
            }
        };

        let messages = match contain_faults(|| self.translate(event)) {
            Ok(messages) => messages,
            Err(e) => {
                error!("Skipping event on {}: {}", event.table.name, e);
                return;
            }
        };

        for message in messages {
            debug!("Delivering message {} to {}", message.uuid, event.table.name);
            if let Err(e) = self.deliver(&sender, &event.table.name, message).await {
                warn!("Stopped delivering event on {}: {}", event.table.name, e);
                return;
            }
        }
    }

    /// Messages for the changes of an event allowed by the emit policy
    pub fn translate(&self, event: &RowsEvent) -> BinlogResult<Vec<Message>> {
        let changes = classify::<MessageRow>(event)?;

        let mut messages = Vec::with_capacity(changes.len());
        for change in changes {
            if !self.emits(&change.action) {
                debug!(
                    "Not publishing {} of message {} on {}",
                    change.action, change.after.uuid, event.table.name
                );
                continue;
            }
            messages.push(change.after.into_message(&change.action, &event.table.name));
        }

        Ok(messages)
    }

    fn emits(&self, action: &RowsAction) -> bool {
        match self.emit {
            EmitPolicy::Inserts => *action == RowsAction::Insert,
            EmitPolicy::AllChanges => true,
        }
    }

    async fn deliver(
        &self,
        sender: &mpsc::Sender<Message>,
        table: &str,
        message: Message,
    ) -> BinlogResult<()> {
        // A full channel holds up the whole stream until a reader catches up
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(BinlogError::stream("shutdown while delivering")),
            result = sender.send(message) => result.map_err(|_| BinlogError::ChannelClosed {
                table: table.to_string(),
            }),
        }
    }
}

#[async_trait]
impl EventSink for Router {
    async fn on_rows(&self, event: &RowsEvent) -> BinlogResult<()> {
        self.handle_event(event).await;
        Ok(())
    }
}

/// Run a translation step, turning a panic into an error
pub(crate) fn contain_faults<T, F>(f: F) -> BinlogResult<T>
where
    F: FnOnce() -> BinlogResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(anyhow::anyhow!("translation panicked: {}", reason).into())
        }
    }
}

//! Binlog subscriber: topic subscriptions on top of a replication stream
//!
//! Construction reads the stream's current position and starts streaming in
//! a background task with the [`Router`] as the event sink. `subscribe`
//! hands out the delivery channel of a topic, creating the backing storage on
//! first use when schema initialization is enabled. `close` stops the stream
//! and ends every subscription.

use crate::core::{BinlogError, BinlogResult, SubscriberConfig};
use crate::event_sink::EventSink;
use crate::replication::{ReplicationStream, StreamPosition};
use crate::router::{Router, Subscription};
use crate::schema::{DefaultMySqlSchema, SchemaAdapter, SchemaInitializer};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Reject empty topics and characters outside `[A-Za-z0-9-$:._]`
pub fn validate_topic_name(topic: &str) -> BinlogResult<()> {
    if topic.is_empty() {
        return Err(BinlogError::invalid_topic(topic, "topic cannot be empty"));
    }

    if let Some(c) = topic
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '$' | ':' | '.' | '_')))
    {
        return Err(BinlogError::invalid_topic(
            topic,
            format!("character {:?} is not allowed", c),
        ));
    }

    Ok(())
}

/// Options for building a [`BinlogSubscriber`]
pub struct SubscriberBuilder {
    config: SubscriberConfig,
    schema: Arc<dyn SchemaAdapter>,
    initializer: Option<Arc<dyn SchemaInitializer>>,
    topics: Vec<String>,
}

impl SubscriberBuilder {
    pub fn new(config: SubscriberConfig) -> Self {
        Self {
            config,
            schema: Arc::new(DefaultMySqlSchema),
            initializer: None,
            topics: Vec::new(),
        }
    }

    pub fn schema_adapter(mut self, schema: Arc<dyn SchemaAdapter>) -> Self {
        self.schema = schema;
        self
    }

    /// Required when `initialize_schema` is enabled
    pub fn schema_initializer(mut self, initializer: Arc<dyn SchemaInitializer>) -> Self {
        self.initializer = Some(initializer);
        self
    }

    /// Subscribe to `topic` before the stream starts, so no event is missed
    pub fn topic<S: Into<String>>(mut self, topic: S) -> Self {
        self.topics.push(topic.into());
        self
    }

    pub async fn start<S: ReplicationStream>(self, stream: S) -> BinlogResult<BinlogSubscriber> {
        self.config.validate()?;
        if self.config.initialize_schema && self.initializer.is_none() {
            return Err(BinlogError::config(
                "schema initialization is enabled but no schema initializer was provided",
            ));
        }

        let shutdown = CancellationToken::new();
        let router = Arc::new(Router::new(
            self.config.reserved_schema.clone(),
            self.config.emit,
            self.config.channel_capacity,
            shutdown.clone(),
        ));

        let subscriber = BinlogSubscriber {
            config: self.config,
            router,
            schema: self.schema,
            initializer: self.initializer,
            initialized: Mutex::new(HashSet::new()),
            shutdown,
            stream_done: CancellationToken::new(),
            stream_task: Mutex::new(None),
        };

        for topic in &self.topics {
            subscriber.subscribe(topic).await?;
        }

        subscriber.bootstrap(stream).await?;
        Ok(subscriber)
    }
}

pub struct BinlogSubscriber {
    config: SubscriberConfig,
    router: Arc<Router>,
    schema: Arc<dyn SchemaAdapter>,
    initializer: Option<Arc<dyn SchemaInitializer>>,
    /// Topics whose backing storage has been created
    initialized: Mutex<HashSet<String>>,
    shutdown: CancellationToken,
    stream_done: CancellationToken,
    stream_task: Mutex<Option<JoinHandle<BinlogResult<()>>>>,
}

impl BinlogSubscriber {
    /// Start streaming with default adapters and no schema initializer
    pub async fn new<S: ReplicationStream>(
        stream: S,
        config: SubscriberConfig,
    ) -> BinlogResult<Self> {
        SubscriberBuilder::new(config).start(stream).await
    }

    pub fn builder(config: SubscriberConfig) -> SubscriberBuilder {
        SubscriberBuilder::new(config)
    }

    async fn bootstrap<S: ReplicationStream>(&self, mut stream: S) -> BinlogResult<()> {
        let position = stream
            .start_position()
            .await
            .map_err(|e| BinlogError::stream(format!("could not get start position: {}", e)))?;
        info!("Starting replication stream at {}", position);

        let handle = self.spawn_stream(stream, position);
        *self.stream_task.lock().await = Some(handle);
        Ok(())
    }

    fn spawn_stream<S: ReplicationStream>(
        &self,
        stream: S,
        position: StreamPosition,
    ) -> JoinHandle<BinlogResult<()>> {
        let sink: Arc<dyn EventSink> = self.router.clone();
        let shutdown = self.shutdown.clone();
        let done = self.stream_done.clone();

        tokio::spawn(async move {
            let result = Box::new(stream).run(position, sink, shutdown).await;
            match &result {
                Ok(()) => info!("Replication stream finished"),
                Err(e) => error!("Replication stream failed: {}", e),
            }
            done.cancel();
            result
        })
    }

    /// Delivery channel of `topic`; repeated calls share one channel
    pub async fn subscribe(&self, topic: &str) -> BinlogResult<Subscription> {
        if self.shutdown.is_cancelled() {
            return Err(BinlogError::stream("subscriber is closed"));
        }
        validate_topic_name(topic)?;

        if self.config.initialize_schema {
            self.subscribe_initialize(topic).await?;
        }

        let table = self.schema.messages_table(topic);
        debug!("Subscribing to topic {} on table {}", topic, table);
        self.router.register(&table).await
    }

    /// Create the backing storage of `topic` unless already done
    pub async fn subscribe_initialize(&self, topic: &str) -> BinlogResult<()> {
        validate_topic_name(topic)?;
        let initializer = self.initializer.as_ref().ok_or_else(|| {
            BinlogError::config("no schema initializer configured for this subscriber")
        })?;

        // Held across initialization so concurrent subscribers wait for it
        let mut initialized = self.initialized.lock().await;
        if initialized.contains(topic) {
            return Ok(());
        }

        initializer.initialize_schema(topic).await?;
        initialized.insert(topic.to_string());
        Ok(())
    }

    /// Resolves once the replication stream has ended for any reason
    pub async fn stream_finished(&self) {
        self.stream_done.cancelled().await
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop the stream and end all subscriptions
    ///
    /// Returns the stream's own error if it failed. Calling it again is a no-op.
    pub async fn close(&self) -> BinlogResult<()> {
        self.shutdown.cancel();

        let handle = self.stream_task.lock().await.take();
        let result = match handle {
            Some(handle) => handle.await?,
            None => Ok(()),
        };

        self.router.unregister_all().await;
        info!("Subscriber closed");
        result
    }
}

impl Drop for BinlogSubscriber {
    fn drop(&mut self) {
        // never leave the stream task running past its owner
        self.shutdown.cancel();
    }
}

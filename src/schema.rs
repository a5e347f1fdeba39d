//! Backing storage naming and provisioning
//!
//! The subscriber only needs two things from storage: the name of a topic's
//! change-log table, and a one-off call that makes sure the table exists.
//! The MySQL defaults below produce the usual `watermill_<topic>` layout;
//! running the SQL is left to a caller-supplied [`SqlExecutor`].

use crate::core::{BinlogError, BinlogResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Names and DDL of a topic's messages table
pub trait SchemaAdapter: Send + Sync {
    fn messages_table(&self, topic: &str) -> String;

    fn schema_initializing_queries(&self, topic: &str) -> Vec<String>;
}

/// Names and DDL of a topic's consumer offsets table
pub trait OffsetsAdapter: Send + Sync {
    fn messages_offsets_table(&self, topic: &str) -> String;

    fn schema_initializing_queries(&self, topic: &str) -> Vec<String>;
}

/// Creates backing storage for a topic; must be idempotent
#[async_trait]
pub trait SchemaInitializer: Send + Sync {
    async fn initialize_schema(&self, topic: &str) -> BinlogResult<()>;
}

/// Runs SQL statements against the source database
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, query: &str) -> BinlogResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct DefaultMySqlSchema;

impl SchemaAdapter for DefaultMySqlSchema {
    fn messages_table(&self, topic: &str) -> String {
        format!("watermill_{}", topic)
    }

    fn schema_initializing_queries(&self, topic: &str) -> Vec<String> {
        vec![format!(
            "CREATE TABLE IF NOT EXISTS `{}` (\n\
             \t`offset` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,\n\
             \t`uuid` VARCHAR(36) NOT NULL,\n\
             \t`created_at` TIMESTAMP(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),\n\
             \t`payload` JSON DEFAULT NULL,\n\
             \t`metadata` JSON DEFAULT NULL\n\
             );",
            self.messages_table(topic)
        )]
    }
}

#[derive(Debug, Clone, Default)]
pub struct DefaultMySqlOffsetsAdapter;

impl OffsetsAdapter for DefaultMySqlOffsetsAdapter {
    fn messages_offsets_table(&self, topic: &str) -> String {
        format!("watermill_offsets_{}", topic)
    }

    fn schema_initializing_queries(&self, topic: &str) -> Vec<String> {
        vec![format!(
            "CREATE TABLE IF NOT EXISTS `{}` (\n\
             \t`consumer_group` VARCHAR(255) NOT NULL,\n\
             \t`offset_acked` BIGINT,\n\
             \t`offset_consumed` BIGINT NOT NULL,\n\
             \tPRIMARY KEY(consumer_group)\n\
             );",
            self.messages_offsets_table(topic)
        )]
    }
}

/// Creates the messages and offsets tables through an executor
pub struct SqlSchemaInitializer {
    executor: Arc<dyn SqlExecutor>,
    schema: Arc<dyn SchemaAdapter>,
    offsets: Arc<dyn OffsetsAdapter>,
}

impl SqlSchemaInitializer {
    pub fn new(
        executor: Arc<dyn SqlExecutor>,
        schema: Arc<dyn SchemaAdapter>,
        offsets: Arc<dyn OffsetsAdapter>,
    ) -> Self {
        Self {
            executor,
            schema,
            offsets,
        }
    }

    /// Executor with the default MySQL adapters
    pub fn mysql(executor: Arc<dyn SqlExecutor>) -> Self {
        Self::new(
            executor,
            Arc::new(DefaultMySqlSchema),
            Arc::new(DefaultMySqlOffsetsAdapter),
        )
    }
}

#[async_trait]
impl SchemaInitializer for SqlSchemaInitializer {
    async fn initialize_schema(&self, topic: &str) -> BinlogResult<()> {
        info!("Initializing schema for topic {}", topic);

        let queries = self
            .schema
            .schema_initializing_queries(topic)
            .into_iter()
            .chain(self.offsets.schema_initializing_queries(topic));

        for query in queries {
            debug!("Executing schema query: {}", query);
            self.executor
                .execute(&query)
                .await
                .map_err(|e| BinlogError::schema_init(topic, e.to_string()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingExecutor {
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl SqlExecutor for RecordingExecutor {
        async fn execute(&self, query: &str) -> BinlogResult<()> {
            if self.fail {
                return Err(BinlogError::stream("connection refused"));
            }
            self.queries.lock().await.push(query.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_default_table_names() {
        assert_eq!(DefaultMySqlSchema.messages_table("orders"), "watermill_orders");
        assert_eq!(
            DefaultMySqlOffsetsAdapter.messages_offsets_table("orders"),
            "watermill_offsets_orders"
        );
    }

    #[tokio::test]
    async fn test_initializer_runs_messages_then_offsets_ddl() {
        let executor = Arc::new(RecordingExecutor::default());
        let initializer = SqlSchemaInitializer::mysql(executor.clone());

        initializer.initialize_schema("orders").await.unwrap();

        let queries = executor.queries.lock().await;
        assert_eq!(queries.len(), 2);
        assert!(queries[0].contains("`watermill_orders`"));
        assert!(queries[0].contains("`metadata` JSON"));
        assert!(queries[1].contains("`watermill_offsets_orders`"));
    }

    #[tokio::test]
    async fn test_initializer_reports_topic_on_failure() {
        let executor = Arc::new(RecordingExecutor {
            fail: true,
            ..Default::default()
        });
        let initializer = SqlSchemaInitializer::mysql(executor);

        let err = initializer.initialize_schema("orders").await.unwrap_err();
        assert!(matches!(err, BinlogError::SchemaInitialization { ref topic, .. } if topic == "orders"));
    }
}

//! Message source
//!
//! `MessageSource` is what the consume loop reads from. `KafkaSource` is the
//! production implementation:
//! - with a consumer group, offsets are tracked by the broker (auto-commit)
//! - without one, the consumer is standalone and must be positioned with
//!   `seek_to_timestamp` before the first read; progress is not persisted

use crate::error::WorkerError;
use crate::message::Message;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_config::kafka::KafkaConfig;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::{Offset, TopicPartitionList};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::{debug, info};

/// Source of messages for the consume loop.
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next message.
    async fn read_next(&mut self) -> Result<Message, WorkerError>;

    /// Position the cursor at the first message at or after `timestamp`.
    async fn seek_to_timestamp(&mut self, timestamp: DateTime<Utc>) -> Result<(), WorkerError>;

    /// Release the subscription or assignment.
    async fn close(&mut self) -> Result<(), WorkerError>;
}

/// Kafka-backed message source
pub struct KafkaSource {
    consumer: Arc<StreamConsumer>,
    topic: String,
    group_id: Option<String>,
    metadata_timeout: Duration,
}

impl KafkaSource {
    /// Create a consumer for `config.topic`.
    ///
    /// With a group id the consumer subscribes immediately; a group without
    /// committed offsets starts at the end of the topic.
    ///
    /// Must be called from within a Tokio runtime: the consumer spawns its
    /// polling task on creation.
    pub fn connect(config: &KafkaConfig, client_id: &str) -> Result<Self, WorkerError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", config.brokers())
            .set("client.id", client_id)
            .set("fetch.max.bytes", "10485760") // 10MB
            .set("enable.partition.eof", "false");

        match &config.group_id {
            Some(group_id) => {
                client_config
                    .set("group.id", group_id)
                    .set("enable.auto.commit", "true")
                    .set("auto.offset.reset", "latest");
            }
            None => {
                // librdkafka needs a group id to hand out a consumer queue; it is
                // never joined because partitions are assigned, not subscribed
                client_config
                    .set("group.id", format!("{client_id}-standalone"))
                    .set("enable.auto.commit", "false");
            }
        }

        let consumer: StreamConsumer = client_config.create()?;

        if config.group_id.is_some() {
            consumer.subscribe(&[config.topic.as_str()])?;
        }

        info!(
            brokers = %config.brokers(),
            topic = %config.topic,
            group = ?config.group_id,
            "Kafka consumer initialized"
        );

        Ok(Self {
            consumer: Arc::new(consumer),
            topic: config.topic.clone(),
            group_id: config.group_id.clone(),
            metadata_timeout: Duration::from_secs(10),
        })
    }

    /// Timeout for metadata and offset lookups during seeking
    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }
}

fn seek_error(topic: &str, details: impl ToString) -> WorkerError {
    WorkerError::Seek {
        topic: topic.to_string(),
        details: details.to_string(),
    }
}

/// Partition ids of `topic`. Blocks for up to `timeout`.
fn partitions(
    consumer: &StreamConsumer,
    topic: &str,
    timeout: Duration,
) -> Result<Vec<i32>, WorkerError> {
    let metadata = consumer
        .fetch_metadata(Some(topic), timeout)
        .map_err(|e| seek_error(topic, e))?;

    let partitions: Vec<i32> = metadata
        .topics()
        .iter()
        .filter(|t| t.name() == topic)
        .flat_map(|t| t.partitions().iter().map(|p| p.id()))
        .collect();

    if partitions.is_empty() {
        return Err(seek_error(topic, "topic has no partitions"));
    }
    Ok(partitions)
}

/// Resolve the offsets at `timestamp_ms` for every partition and assign them.
/// Blocks on broker round trips; run it off the async workers.
fn assign_at_timestamp(
    consumer: &StreamConsumer,
    topic: &str,
    timestamp_ms: i64,
    timeout: Duration,
) -> Result<TopicPartitionList, WorkerError> {
    let partitions = partitions(consumer, topic, timeout)?;

    let mut timestamps = TopicPartitionList::new();
    for partition in partitions {
        timestamps
            .add_partition_offset(topic, partition, Offset::Offset(timestamp_ms))
            .map_err(|e| seek_error(topic, e))?;
    }

    // Partitions with nothing at or after the timestamp resolve to the end
    let offsets = consumer
        .offsets_for_times(timestamps, timeout)
        .map_err(|e| seek_error(topic, e))?;

    consumer.assign(&offsets).map_err(|e| seek_error(topic, e))?;
    Ok(offsets)
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn read_next(&mut self) -> Result<Message, WorkerError> {
        let message = self.consumer.recv().await?;
        Ok(Message::from_kafka(&message))
    }

    async fn seek_to_timestamp(&mut self, timestamp: DateTime<Utc>) -> Result<(), WorkerError> {
        let consumer = Arc::clone(&self.consumer);
        let topic = self.topic.clone();
        let timeout = self.metadata_timeout;
        let timestamp_ms = timestamp.timestamp_millis();

        let offsets = task::spawn_blocking(move || {
            assign_at_timestamp(&consumer, &topic, timestamp_ms, timeout)
        })
        .await
        .map_err(|e| seek_error(&self.topic, e))??;

        for element in offsets.elements() {
            debug!(
                partition = element.partition(),
                offset = ?element.offset(),
                "Partition positioned"
            );
        }

        info!(
            topic = %self.topic,
            timestamp = %timestamp,
            partitions = offsets.count(),
            "Consumer positioned at timestamp"
        );

        Ok(())
    }

    async fn close(&mut self) -> Result<(), WorkerError> {
        if self.group_id.is_some() {
            self.consumer.unsubscribe();
        } else {
            self.consumer.unassign()?;
        }

        info!(topic = %self.topic, "Kafka consumer closed");
        Ok(())
    }
}

//! Dead-letter publishing
//!
//! Messages that exhausted their attempts are republished, unchanged apart
//! from the topic, to the dead-letter topic. A failed publish is reported to
//! the caller, which logs it; nothing is retried.

use crate::error::WorkerError;
use crate::message::Message;
use async_trait::async_trait;
use core_config::kafka::KafkaConfig;
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header as KafkaHeader, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{debug, info};

/// How long a publish may wait for room in the producer queue.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Narrow write interface used by the retry engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeadLetterPublisher: Send + Sync {
    /// Publish `record` to `record.topic`.
    async fn publish(&self, record: &Message) -> Result<(), WorkerError>;
}

/// Kafka producer for the dead-letter topic.
///
/// Configured for:
/// - `acks=all`: every in-sync replica must acknowledge
/// - `allow.auto.create.topics=true`: a missing dead-letter topic is created
///   on first publish (the broker must allow auto-creation)
pub struct KafkaDeadLetterPublisher {
    producer: FutureProducer,
}

impl KafkaDeadLetterPublisher {
    /// Create the producer. No connection is made until the first publish.
    pub fn new(config: &KafkaConfig, client_id: &str) -> Result<Self, WorkerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.brokers())
            .set("client.id", client_id)
            .set("acks", "all")
            .set("allow.auto.create.topics", "true")
            .set("message.timeout.ms", "30000")
            .create()?;

        info!(
            brokers = %config.brokers(),
            topic = %config.dead_letter_topic,
            "Dead-letter producer initialized"
        );

        Ok(Self { producer })
    }
}

/// Headers in their original order, duplicates included.
fn kafka_headers(record: &Message) -> OwnedHeaders {
    record
        .headers
        .iter()
        .fold(OwnedHeaders::new_with_capacity(record.headers.len()), |headers, header| {
            headers.insert(KafkaHeader {
                key: header.key.as_str(),
                value: Some(header.value.as_slice()),
            })
        })
}

#[async_trait]
impl DeadLetterPublisher for KafkaDeadLetterPublisher {
    async fn publish(&self, record: &Message) -> Result<(), WorkerError> {
        let mut kafka_record: FutureRecord<'_, [u8], [u8]> = FutureRecord::to(&record.topic)
            .payload(record.value.as_slice())
            .headers(kafka_headers(record));

        if let Some(key) = record.key.as_deref() {
            kafka_record = kafka_record.key(key);
        }
        if let Some(timestamp) = record.timestamp {
            kafka_record = kafka_record.timestamp(timestamp);
        }

        self.producer
            .send(kafka_record, Timeout::After(SEND_TIMEOUT))
            .await
            .map_err(|(e, _)| WorkerError::Kafka(e))?;

        debug!(topic = %record.topic, "Dead-letter record acknowledged");
        Ok(())
    }
}

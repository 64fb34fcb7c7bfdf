//! Offset initialization policy, evaluated once before the first read.

use crate::consumer::MessageSource;
use crate::error::WorkerError;
use chrono::{DateTime, Utc};
use tracing::info;

/// Where the consume loop starts reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffsetPolicy {
    /// The broker tracks progress for this consumer group; no seek.
    ConsumerGroup(String),
    /// Standalone: start at the first message at or after this instant.
    /// Every restart replays from here.
    Timestamp(DateTime<Utc>),
}

impl OffsetPolicy {
    /// Group mode when a group id is configured, timestamp mode otherwise.
    pub fn from_settings(group_id: Option<&str>, offset_time: DateTime<Utc>) -> Self {
        match group_id {
            Some(group) if !group.is_empty() => OffsetPolicy::ConsumerGroup(group.to_string()),
            _ => OffsetPolicy::Timestamp(offset_time),
        }
    }

    /// Position `source` according to the policy.
    pub async fn apply<S: MessageSource + ?Sized>(&self, source: &mut S) -> Result<(), WorkerError> {
        match self {
            OffsetPolicy::ConsumerGroup(group) => {
                info!(group = %group, "Offsets managed by consumer group");
                Ok(())
            }
            OffsetPolicy::Timestamp(timestamp) => {
                info!(timestamp = %timestamp, "Standalone mode, seeking to timestamp");
                source.seek_to_timestamp(*timestamp).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use async_trait::async_trait;
    use chrono::TimeZone;

    #[derive(Default)]
    struct RecordingSource {
        seeks: Vec<DateTime<Utc>>,
    }

    #[async_trait]
    impl MessageSource for RecordingSource {
        async fn read_next(&mut self) -> Result<Message, WorkerError> {
            Err(WorkerError::Internal("not used".into()))
        }

        async fn seek_to_timestamp(&mut self, timestamp: DateTime<Utc>) -> Result<(), WorkerError> {
            self.seeks.push(timestamp);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), WorkerError> {
            Ok(())
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_from_settings() {
        assert_eq!(
            OffsetPolicy::from_settings(Some("workers"), start()),
            OffsetPolicy::ConsumerGroup("workers".to_string())
        );
        assert_eq!(
            OffsetPolicy::from_settings(None, start()),
            OffsetPolicy::Timestamp(start())
        );
        assert_eq!(
            OffsetPolicy::from_settings(Some(""), start()),
            OffsetPolicy::Timestamp(start())
        );
    }

    #[tokio::test]
    async fn test_group_mode_does_not_seek() {
        let mut source = RecordingSource::default();
        OffsetPolicy::ConsumerGroup("workers".into())
            .apply(&mut source)
            .await
            .unwrap();
        assert!(source.seeks.is_empty());
    }

    #[tokio::test]
    async fn test_timestamp_mode_seeks_once() {
        let mut source = RecordingSource::default();
        OffsetPolicy::Timestamp(start())
            .apply(&mut source)
            .await
            .unwrap();
        assert_eq!(source.seeks, vec![start()]);
    }
}

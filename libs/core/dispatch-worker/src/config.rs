//! Dispatch configuration
//!
//! This module provides `DispatchConfig` for configuring the retry engine and
//! the consume loop.

use crate::backoff::BackoffPolicy;
use crate::error::WorkerError;
use std::time::Duration;

/// Configuration for the dispatch worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Source topic name
    pub topic: String,

    /// Dead-letter topic name
    pub dead_letter_topic: String,

    /// Downstream attempts per message before dead-lettering (>= 1)
    pub max_attempts: u32,

    /// Wait between attempts
    pub backoff: BackoffPolicy,

    /// Pause after a failed read before reading again
    pub read_error_pause: Duration,
}

impl DispatchConfig {
    /// Create a new DispatchConfig with the default backoff (1s base, 30s cap)
    pub fn new(
        topic: impl Into<String>,
        dead_letter_topic: impl Into<String>,
        max_attempts: u32,
    ) -> Self {
        Self {
            topic: topic.into(),
            dead_letter_topic: dead_letter_topic.into(),
            max_attempts,
            backoff: BackoffPolicy::default(),
            read_error_pause: Duration::from_secs(1),
        }
    }

    /// Set the backoff policy
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the pause after a read error
    pub fn with_read_error_pause(mut self, pause: Duration) -> Self {
        self.read_error_pause = pause;
        self
    }

    /// Reject configurations the worker cannot run with.
    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.max_attempts == 0 {
            return Err(WorkerError::Config(
                "max attempts must be at least 1".to_string(),
            ));
        }
        if self.topic.is_empty() || self.dead_letter_topic.is_empty() {
            return Err(WorkerError::Config(
                "topic and dead-letter topic must not be empty".to_string(),
            ));
        }
        // Dead-lettering into the source topic would feed failures back forever
        if self.topic == self.dead_letter_topic {
            return Err(WorkerError::Config(format!(
                "dead-letter topic must differ from source topic '{}'",
                self.topic
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::new("orders", "orders-dlq", 3);

        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff, BackoffPolicy::default());
        assert_eq!(config.read_error_pause, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let backoff = BackoffPolicy::new(Duration::from_millis(10), Duration::from_millis(50));
        let config = DispatchConfig::new("orders", "orders-dlq", 5)
            .with_backoff(backoff)
            .with_read_error_pause(Duration::ZERO);

        assert_eq!(config.backoff, backoff);
        assert_eq!(config.read_error_pause, Duration::ZERO);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let err = DispatchConfig::new("orders", "orders-dlq", 0)
            .validate()
            .unwrap_err();
        assert!(err.is_startup());
    }

    #[test]
    fn test_validate_rejects_same_topic() {
        let err = DispatchConfig::new("orders", "orders", 3)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_validate_rejects_empty_topic() {
        assert!(DispatchConfig::new("", "orders-dlq", 3).validate().is_err());
    }
}

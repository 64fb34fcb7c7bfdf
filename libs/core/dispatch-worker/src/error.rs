//! Worker error types
//!
//! Steady-state errors never stop the worker: read errors are skipped,
//! invoke errors drive the retry engine and dead-letter publish errors are
//! logged. Only startup errors (configuration, offset seek) are fatal.

use thiserror::Error;

/// Dispatch worker errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Kafka client, consumer or producer error
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Transport-level failure calling the downstream endpoint
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Downstream answered with anything other than 200
    #[error("Unexpected response status: {status}")]
    UnexpectedStatus { status: u16 },

    /// Invalid worker configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Initial offset positioning failed
    #[error("Failed to seek topic '{topic}': {details}")]
    Seek { topic: String, details: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    /// Whether this error happened before the worker started consuming.
    ///
    /// Startup errors stop the process; everything else is handled per message.
    pub fn is_startup(&self) -> bool {
        matches!(self, WorkerError::Config(_) | WorkerError::Seek { .. })
    }

    /// Whether this error came from the downstream call
    pub fn is_invoke_failure(&self) -> bool {
        matches!(
            self,
            WorkerError::Http(_) | WorkerError::UnexpectedStatus { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(WorkerError::Config("bad".into()).is_startup());
        assert!(
            WorkerError::Seek {
                topic: "orders".into(),
                details: "no partitions".into()
            }
            .is_startup()
        );
        assert!(!WorkerError::UnexpectedStatus { status: 500 }.is_startup());

        assert!(WorkerError::UnexpectedStatus { status: 404 }.is_invoke_failure());
        assert!(!WorkerError::Internal("x".into()).is_invoke_failure());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            WorkerError::UnexpectedStatus { status: 503 }.to_string(),
            "Unexpected response status: 503"
        );
        assert_eq!(
            WorkerError::Seek {
                topic: "orders".into(),
                details: "no partitions".into()
            }
            .to_string(),
            "Failed to seek topic 'orders': no partitions"
        );
    }
}

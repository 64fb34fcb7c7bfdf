//! Dispatch Worker
//!
//! Consumes a Kafka topic and forwards every message to an HTTP endpoint.
//!
//! ## Features
//!
//! - **Sequential dispatch**: one message in flight, per-partition order kept
//! - **Bounded retry**: exponential backoff between attempts (2s, 4s, 8s, ...)
//! - **Dead-letter topic**: exhausted messages are republished unchanged
//! - **Request ids**: `x-request-id` is propagated to every attempt, or generated
//! - **Offset modes**: consumer group, or standalone seek to a timestamp
//! - **Health endpoints**: liveness, readiness and Prometheus metrics
//!
//! ## Example
//!
//! ```ignore
//! use dispatch_worker::{
//!     DispatchConfig, DispatchWorker, HttpInvoker, KafkaDeadLetterPublisher, KafkaSource,
//!     OffsetPolicy, RetryEngine,
//! };
//!
//! let source = KafkaSource::connect(&kafka, "http-worker-1")?;
//! let publisher = KafkaDeadLetterPublisher::new(&kafka, "http-worker-1")?;
//! let invoker = HttpInvoker::new("POST", "http://orders:8080/events")?;
//! let config = DispatchConfig::new(&kafka.topic, &kafka.dead_letter_topic, 3);
//!
//! let engine = RetryEngine::new(invoker, publisher, config);
//! let offsets = OffsetPolicy::from_settings(kafka.group_id.as_deref(), offset_time);
//! DispatchWorker::new(source, engine, offsets).run(shutdown_rx).await?;
//! ```

mod backoff;
mod config;
mod consumer;
mod dlq;
mod error;
mod health;
mod invoker;
mod message;
pub mod metrics;
mod offset;
mod request_id;
mod retry;
mod shutdown;
mod worker;

// Re-export main types
pub use backoff::{BackoffPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY};
pub use config::DispatchConfig;
pub use consumer::{KafkaSource, MessageSource};
pub use dlq::{DeadLetterPublisher, KafkaDeadLetterPublisher};
pub use error::WorkerError;
pub use health::{health_router, HealthState};
pub use invoker::{HttpInvoker, Invoker};
pub use message::{Header, Message};
pub use metrics::{init_metrics, DispatchMetrics};
pub use offset::OffsetPolicy;
pub use request_id::{resolve_request_id, RequestContext, REQUEST_ID_HEADER};
pub use retry::{Outcome, RetryEngine, RetryState};
pub use shutdown::{is_shutdown, wait_for_shutdown};
pub use worker::DispatchWorker;

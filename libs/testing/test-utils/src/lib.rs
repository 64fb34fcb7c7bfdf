//! Shared test utilities
//!
//! This crate provides reusable test infrastructure for the worker crates:
//! - `TestDownstream`: mock HTTP endpoint with scripted responses (always available)
//! - `TestKafka`: Kafka container with automatic cleanup (feature: "kafka")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//!
//! # Features
//!
//! - `kafka`: Enables Kafka test infrastructure
//! - `all`: Enables all container test infrastructure
//!
//! # Usage
//!
//! ## Downstream Testing
//!
//! ```rust,no_run
//! use test_utils::TestDownstream;
//!
//! #[tokio::test]
//! async fn my_downstream_test() {
//!     let downstream = TestDownstream::builder().respond(500).start().await;
//!     let url = downstream.url("/events");
//!     // first call gets 500, later calls 200
//! }
//! ```
//!
//! ## Kafka Testing
//!
//! Add `features = ["kafka"]` to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["kafka"] }
//! ```
//!
//! Then in your tests:
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestKafka};
//!
//! #[tokio::test]
//! async fn my_kafka_test() {
//!     let kafka = TestKafka::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_kafka_test");
//!     let topic = builder.name("topic", "source");
//!     // produce to `topic` on `kafka.bootstrap_servers()`
//! }
//! ```

use uuid::Uuid;

mod downstream;

#[cfg(feature = "kafka")]
mod kafka;

pub use downstream::{RecordedRequest, TestDownstream, TestDownstreamBuilder};

#[cfg(feature = "kafka")]
pub use kafka::TestKafka;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_dead_letter");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Deterministic request id for testing
    pub fn request_id(&self) -> String {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        Uuid::from_bytes(uuid_bytes).to_string()
    }

    /// Generate a unique name for testing
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("my_test");
    /// let topic = builder.name("topic", "source");
    /// // Returns: "test-topic-12345-source"
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }
}

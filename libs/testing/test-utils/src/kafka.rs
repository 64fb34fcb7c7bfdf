//! Kafka test infrastructure
//!
//! Provides a `TestKafka` helper that starts a single-node Kafka broker.

use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::kafka::{KAFKA_PORT, Kafka};

/// Test Kafka wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
/// Topics are auto-created by the broker on first use.
///
/// # Example
///
/// ```no_run
/// use test_utils::TestKafka;
///
/// # async fn example() {
/// let kafka = TestKafka::new().await;
/// let brokers = kafka.bootstrap_servers();
/// // Point producers and consumers at `brokers`
/// # }
/// ```
pub struct TestKafka {
    #[allow(dead_code)]
    container: ContainerAsync<Kafka>,
    pub host: String,
    pub port: u16,
}

impl TestKafka {
    /// Start a new Kafka broker
    pub async fn new() -> Self {
        let container = Kafka::default()
            .start()
            .await
            .expect("Failed to start Kafka container");

        let port = container
            .get_host_port_ipv4(KAFKA_PORT)
            .await
            .expect("Failed to get Kafka port");

        tracing::info!(port, "Test Kafka ready");

        Self {
            container,
            host: "127.0.0.1".to_string(),
            port,
        }
    }

    /// `host:port` for `bootstrap.servers`
    pub fn bootstrap_servers(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Drop for TestKafka {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Kafka container");
    }
}

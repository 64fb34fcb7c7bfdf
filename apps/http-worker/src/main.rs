//! HTTP Worker Service - Entry Point
//!
//! Forwards messages from a Kafka topic to an HTTP endpoint.

use core_config::tracing::install_color_eyre;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output
    install_color_eyre();

    http_worker::run().await
}

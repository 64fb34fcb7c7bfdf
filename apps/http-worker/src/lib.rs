//! HTTP Worker Service
//!
//! Consumes a Kafka topic and forwards every message to a fixed HTTP endpoint.
//!
//! ## Architecture
//!
//! ```text
//! Kafka topic (TOPIC_NAME)
//!   ↓ (consumer group GROUP_ID, or standalone seek to OFFSET_TIME)
//! DispatchWorker
//!   ↓ (INVOKING_METHOD INVOKING_URL, X-Request-Id, up to MAX_RETRY_ATTEMPT tries)
//! Downstream HTTP service
//!   ↓ (retries exhausted)
//! Kafka dead-letter topic (DLQ_TOPIC_NAME)
//! ```
//!
//! ## Features
//!
//! - One message in flight at a time, per-partition order preserved
//! - Exponential backoff between attempts
//! - Dead-letter topic for messages the downstream never accepted
//! - Graceful shutdown handling
//! - Optional health and metrics endpoint for Kubernetes probes

pub mod config;

use axum::Router;
use core_config::{Environment, FromEnv};
use dispatch_worker::{
    health_router, metrics, DispatchConfig, DispatchWorker, HealthState, HttpInvoker,
    KafkaDeadLetterPublisher, KafkaSource, OffsetPolicy, RetryEngine,
};
use eyre::{Result, WrapErr};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

pub use config::WorkerSettings;

/// Start the health HTTP server
///
/// Provides endpoints for:
/// - Liveness probes: `/health`, `/healthz`
/// - Readiness probes: `/ready`, `/readyz`
/// - Prometheus metrics: `/metrics`
async fn start_health_server(health_state: HealthState, port: u16) -> Result<()> {
    let app: Router = health_router(health_state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", addr))?;

    info!(port = %port, "Health server listening");

    axum::serve(listener, app)
        .await
        .wrap_err("Health server failed")?;

    Ok(())
}

/// Run the HTTP worker
///
/// 1. Sets up structured logging (JSON for prod, pretty for dev)
/// 2. Loads settings from the environment
/// 3. Connects the Kafka consumer and the dead-letter producer
/// 4. Runs the consume loop until a shutdown signal arrives
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is missing or invalid
/// - A Kafka client cannot be created
/// - The initial offset seek fails
/// - The consumer cannot be closed cleanly
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    metrics::init_metrics();

    let app_name = env!("CARGO_PKG_NAME");
    let app_version = env!("CARGO_PKG_VERSION");
    info!(name = %app_name, version = %app_version, "Starting HTTP worker service");
    info!("Environment: {:?}", environment);

    let settings = WorkerSettings::from_env().wrap_err("Failed to load worker configuration")?;
    let client_id = settings.client_id();
    info!(
        client_id = %client_id,
        topic = %settings.kafka.topic,
        dead_letter_topic = %settings.kafka.dead_letter_topic,
        group = ?settings.kafka.group_id,
        max_attempts = settings.max_retry_attempt,
        method = %settings.invoking_method,
        url = %settings.invoking_url,
        "Worker configuration loaded"
    );
    if settings.search.is_configured() {
        info!(host = ?settings.search.host, "Search settings present but unused");
    }

    let invoker = HttpInvoker::new(&settings.invoking_method, &settings.invoking_url)
        .wrap_err("Invalid downstream endpoint")?
        .with_timeout(settings.invoke_timeout);

    let source = KafkaSource::connect(&settings.kafka, &client_id)
        .wrap_err("Failed to create Kafka consumer")?;
    let dead_letter = KafkaDeadLetterPublisher::new(&settings.kafka, &client_id)
        .wrap_err("Failed to create dead-letter producer")?;

    let dispatch_config = DispatchConfig::new(
        settings.kafka.topic.clone(),
        settings.kafka.dead_letter_topic.clone(),
        settings.max_retry_attempt,
    );
    let engine = RetryEngine::new(invoker, dead_letter, dispatch_config);
    let offsets =
        OffsetPolicy::from_settings(settings.kafka.group_id.as_deref(), settings.offset_time);

    // Set up a shutdown signal; handlers are installed before consuming starts
    let signals = ShutdownSignals::install()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        signals.recv().await;
        let _ = shutdown_tx.send(true);
    });

    let mut worker = DispatchWorker::new(source, engine, offsets);

    if let Some(port) = settings.health_port {
        let health_state = HealthState::new(
            app_name,
            app_version,
            settings.kafka.topic.clone(),
            settings.kafka.dead_letter_topic.clone(),
        );
        worker = worker.with_health(health_state.clone());

        tokio::spawn(async move {
            if let Err(e) = start_health_server(health_state, port).await {
                error!(error = %e, "Health server failed");
            }
        });
    }

    worker
        .run(shutdown_rx)
        .await
        .wrap_err("Dispatch worker failed")?;

    info!("HTTP worker service stopped");
    Ok(())
}

/// Process signals that request a graceful shutdown
/// (Ctrl+C, SIGTERM, SIGQUIT or SIGHUP)
struct ShutdownSignals {
    #[cfg(unix)]
    terminate: signal::unix::Signal,
    #[cfg(unix)]
    quit: signal::unix::Signal,
    #[cfg(unix)]
    hangup: signal::unix::Signal,
}

impl ShutdownSignals {
    /// Register the handlers. Must run inside the Tokio runtime.
    fn install() -> Result<Self> {
        #[cfg(unix)]
        {
            use signal::unix::SignalKind;

            Ok(Self {
                terminate: signal::unix::signal(SignalKind::terminate())
                    .wrap_err("Failed to install SIGTERM handler")?,
                quit: signal::unix::signal(SignalKind::quit())
                    .wrap_err("Failed to install SIGQUIT handler")?,
                hangup: signal::unix::signal(SignalKind::hangup())
                    .wrap_err("Failed to install SIGHUP handler")?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the first signal and return its name.
    async fn recv(mut self) -> &'static str {
        #[cfg(unix)]
        let name = {
            let mut ctrl_c_enabled = true;
            loop {
                tokio::select! {
                    result = signal::ctrl_c(), if ctrl_c_enabled => match result {
                        Ok(()) => break "Ctrl+C",
                        Err(e) => {
                            // keep waiting on the remaining signals
                            error!(error = %e, "Failed to listen for Ctrl+C");
                            ctrl_c_enabled = false;
                        }
                    },
                    _ = self.terminate.recv() => break "SIGTERM",
                    _ = self.quit.recv() => break "SIGQUIT",
                    _ = self.hangup.recv() => break "SIGHUP",
                }
            }
        };

        #[cfg(not(unix))]
        let name = match signal::ctrl_c().await {
            Ok(()) => "Ctrl+C",
            Err(e) => {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<&'static str>().await
            }
        };

        info!("Received {}, initiating shutdown...", name);
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_requests_shutdown() {
        let signals = ShutdownSignals::install().unwrap();
        let mut waiting = tokio::spawn(signals.recv());

        // installing alone must not request shutdown
        let early = tokio::time::timeout(Duration::from_millis(200), &mut waiting).await;
        assert!(early.is_err());

        let status = std::process::Command::new("kill")
            .args(["-HUP", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let name = tokio::time::timeout(Duration::from_secs(5), waiting)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(name, "SIGHUP");
    }
}

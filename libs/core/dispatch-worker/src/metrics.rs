//! Prometheus metrics for the dispatch worker
//!
//! Provides observability into throughput, retries and dead-lettering.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::{info, warn};

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize Prometheus metrics
///
/// Call this once at startup. Subsequent calls are no-ops. If another recorder
/// is already installed, metrics stay disabled and `/metrics` reports 503.
pub fn init_metrics() {
    if PROMETHEUS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_ok() {
                info!("Prometheus metrics initialized");
            }
        }
        Err(e) => warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Get the Prometheus handle for rendering metrics
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Dispatch metrics labelled with the source topic
#[derive(Debug, Clone)]
pub struct DispatchMetrics {
    topic: String,
}

impl DispatchMetrics {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// A message was read from the source
    pub fn message_received(&self) {
        counter!("http_worker_messages_received_total", "topic" => self.topic.clone())
            .increment(1);
    }

    /// A read from the source failed and was skipped
    pub fn read_failed(&self) {
        counter!("http_worker_read_errors_total", "topic" => self.topic.clone()).increment(1);
    }

    /// Duration of one downstream call, whatever its outcome
    pub fn invoke_duration(&self, duration: Duration) {
        histogram!("http_worker_invoke_duration_seconds", "topic" => self.topic.clone())
            .record(duration.as_secs_f64());
    }

    /// The downstream accepted the message
    pub fn message_dispatched(&self, attempts: u32) {
        counter!(
            "http_worker_messages_processed_total",
            "topic" => self.topic.clone(),
            "status" => "success"
        )
        .increment(1);

        histogram!("http_worker_attempts_per_message", "topic" => self.topic.clone())
            .record(f64::from(attempts));
    }

    /// One downstream attempt failed
    pub fn attempt_failed(&self) {
        counter!("http_worker_attempt_failures_total", "topic" => self.topic.clone())
            .increment(1);
    }

    /// A retry was scheduled after a backoff
    pub fn retry_scheduled(&self) {
        counter!("http_worker_retries_total", "topic" => self.topic.clone()).increment(1);
    }

    /// A message was handed to the dead-letter topic
    pub fn dead_lettered(&self) {
        counter!(
            "http_worker_messages_processed_total",
            "topic" => self.topic.clone(),
            "status" => "dead_lettered"
        )
        .increment(1);
    }

    /// Publishing to the dead-letter topic failed; the message is dropped
    pub fn dead_letter_failed(&self) {
        counter!(
            "http_worker_messages_processed_total",
            "topic" => self.topic.clone(),
            "status" => "dropped"
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = DispatchMetrics::new("orders");
        assert_eq!(metrics.topic(), "orders");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let metrics = DispatchMetrics::new("orders");
        metrics.message_received();
        metrics.attempt_failed();
        metrics.invoke_duration(Duration::from_millis(5));
        metrics.dead_lettered();
    }

    #[test]
    fn test_init_metrics_is_idempotent() {
        init_metrics();
        init_metrics();

        if let Some(handle) = get_metrics_handle() {
            DispatchMetrics::new("idempotent").message_received();
            assert!(handle.render().contains("http_worker_messages_received_total"));
        }
    }
}

//! The consume loop.
//!
//! `DispatchWorker` reads one message at a time and hands it to the retry
//! engine; the next read happens only after the previous message reached a
//! final outcome, so per-partition order is preserved.

use crate::consumer::MessageSource;
use crate::dlq::DeadLetterPublisher;
use crate::error::WorkerError;
use crate::health::HealthState;
use crate::invoker::Invoker;
use crate::offset::OffsetPolicy;
use crate::request_id::RequestContext;
use crate::retry::{Outcome, RetryEngine};
use crate::shutdown::{is_shutdown, wait_for_shutdown};
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, Instrument};

/// Sequential Kafka-to-HTTP worker
pub struct DispatchWorker<S, I, D> {
    source: S,
    engine: RetryEngine<I, D>,
    offsets: OffsetPolicy,
    health: Option<HealthState>,
}

impl<S, I, D> DispatchWorker<S, I, D>
where
    S: MessageSource,
    I: Invoker,
    D: DeadLetterPublisher,
{
    pub fn new(source: S, engine: RetryEngine<I, D>, offsets: OffsetPolicy) -> Self {
        Self {
            source,
            engine,
            offsets,
            health: None,
        }
    }

    /// Report readiness through `health` while consuming.
    pub fn with_health(mut self, health: HealthState) -> Self {
        self.health = Some(health);
        self
    }

    /// Run until shutdown is requested.
    ///
    /// Returns an error only for startup failures (invalid configuration,
    /// offset initialization) and for a failure to close the source.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), WorkerError> {
        self.engine.config().validate()?;

        let topic = self.engine.config().topic.clone();
        info!(
            topic = %topic,
            dead_letter_topic = %self.engine.config().dead_letter_topic,
            max_attempts = self.engine.config().max_attempts,
            "Starting dispatch worker"
        );

        self.offsets.apply(&mut self.source).await?;
        self.set_ready(true);

        let metrics = self.engine.metrics().clone();
        let pause = self.engine.config().read_error_pause;

        loop {
            if is_shutdown(&shutdown) {
                info!("Shutdown signal received, stopping worker");
                break;
            }

            let read = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => continue,
                read = self.source.read_next() => read,
            };

            let message = match read {
                Ok(message) => message,
                Err(e) => {
                    metrics.read_failed();
                    error!(error = %e, "Failed to read message");
                    tokio::select! {
                        _ = wait_for_shutdown(&mut shutdown) => {}
                        _ = tokio::time::sleep(pause) => {}
                    }
                    continue;
                }
            };

            metrics.message_received();
            let context = RequestContext::resolve(&message.headers);
            let span = info_span!(
                "dispatch",
                request_id = %context.request_id,
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
            );

            let outcome = self
                .engine
                .dispatch(&message, &context, &mut shutdown)
                .instrument(span)
                .await;

            debug!(request_id = %context.request_id, ?outcome, "Message finished");
            if outcome == Outcome::Interrupted {
                break;
            }
        }

        self.set_ready(false);
        self.source.close().await?;
        info!(topic = %topic, "Dispatch worker stopped");
        Ok(())
    }

    fn set_ready(&self, ready: bool) {
        if let Some(health) = &self.health {
            health.set_ready(ready);
        }
    }
}

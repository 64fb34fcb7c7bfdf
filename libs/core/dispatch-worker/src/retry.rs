//! Retry engine
//!
//! Drives one message through up to `max_attempts` downstream calls. Every
//! failed attempt is followed by an exponential backoff wait, including the
//! last one, and an exhausted message is forwarded unchanged to the
//! dead-letter topic. A shutdown request during a wait dead-letters the
//! message immediately instead of dropping it.

use crate::config::DispatchConfig;
use crate::dlq::DeadLetterPublisher;
use crate::error::WorkerError;
use crate::invoker::Invoker;
use crate::message::Message;
use crate::metrics::DispatchMetrics;
use crate::request_id::RequestContext;
use crate::shutdown::wait_for_shutdown;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Attempt counter for a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempts_made: u32,
    max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts_made: 0,
            max_attempts,
        }
    }

    pub fn can_attempt(&self) -> bool {
        self.attempts_made < self.max_attempts
    }

    /// Count a failed attempt and return the failures so far.
    pub fn record_failure(&mut self) -> u32 {
        self.attempts_made += 1;
        self.attempts_made
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts_made)
    }
}

/// Result of one attempt, or of a whole dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The downstream accepted the message.
    Success,
    /// One attempt failed and may be retried. Never the result of `dispatch`.
    Failure,
    /// Every attempt failed; the message was handed to the dead-letter topic.
    Exhausted,
    /// Shutdown arrived while waiting to retry; the message was handed to the
    /// dead-letter topic.
    Interrupted,
}

impl Outcome {
    /// Classify a single downstream call.
    pub fn of_attempt(result: &Result<(), WorkerError>) -> Self {
        match result {
            Ok(()) => Outcome::Success,
            Err(_) => Outcome::Failure,
        }
    }
}

/// Invokes the downstream with retries and dead-letters what cannot be delivered.
pub struct RetryEngine<I, D> {
    invoker: I,
    dead_letter: D,
    config: DispatchConfig,
    metrics: DispatchMetrics,
}

impl<I, D> RetryEngine<I, D>
where
    I: Invoker,
    D: DeadLetterPublisher,
{
    pub fn new(invoker: I, dead_letter: D, config: DispatchConfig) -> Self {
        let metrics = DispatchMetrics::new(config.topic.clone());
        Self {
            invoker,
            dead_letter,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    /// Deliver `message` to the downstream.
    ///
    /// An attempt in flight is never aborted; shutdown is only observed
    /// between attempts.
    pub async fn dispatch(
        &self,
        message: &Message,
        context: &RequestContext,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Outcome {
        let mut state = RetryState::new(self.config.max_attempts);

        while state.can_attempt() {
            let attempt = state.attempts_made() + 1;
            debug!(
                attempt,
                max_attempts = state.max_attempts(),
                invoker = self.invoker.name(),
                "Invoking downstream"
            );

            let started = Instant::now();
            let result = self.invoker.invoke(&message.value, context).await;

            let elapsed = started.elapsed();
            self.metrics.invoke_duration(elapsed);
            debug!(
                attempt,
                outcome = ?Outcome::of_attempt(&result),
                elapsed_ms = elapsed.as_millis() as u64,
                "Attempt finished"
            );

            let err = match result {
                Ok(()) => {
                    self.metrics.message_dispatched(attempt);
                    info!(attempt, "Message delivered");
                    return Outcome::Success;
                }
                Err(e) => e,
            };

            let failures = state.record_failure();
            self.metrics.attempt_failed();
            let delay = self.config.backoff.delay(failures);
            warn!(
                attempt = failures,
                max_attempts = state.max_attempts(),
                remaining = state.remaining(),
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Downstream call failed"
            );

            if state.remaining() > 0 {
                self.metrics.retry_scheduled();
            }

            tokio::select! {
                biased;
                _ = wait_for_shutdown(shutdown) => {
                    info!(attempts = failures, "Shutdown during backoff, dead-lettering message");
                    self.dead_letter(message, context).await;
                    return Outcome::Interrupted;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        warn!(
            attempts = state.attempts_made(),
            dead_letter_topic = %self.config.dead_letter_topic,
            "Retries exhausted, dead-lettering message"
        );
        self.dead_letter(message, context).await;
        Outcome::Exhausted
    }

    /// Publish a copy of `message` to the dead-letter topic. Failures are
    /// logged and the message is dropped.
    async fn dead_letter(&self, message: &Message, context: &RequestContext) {
        let record = message.retarget(self.config.dead_letter_topic.clone());

        match self.dead_letter.publish(&record).await {
            Ok(()) => {
                self.metrics.dead_lettered();
                info!(
                    request_id = %context.request_id,
                    dead_letter_topic = %record.topic,
                    "Message sent to dead-letter topic"
                );
            }
            Err(e) => {
                self.metrics.dead_letter_failed();
                error!(
                    request_id = %context.request_id,
                    dead_letter_topic = %record.topic,
                    error = %e,
                    "Failed to publish to dead-letter topic, message dropped"
                );
            }
        }
    }
}

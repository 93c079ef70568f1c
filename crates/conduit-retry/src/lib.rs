//! The bounded, fixed-delay retry policy described in spec §4.7.
//!
//! Each retried attempt is re-submitted through a
//! [`conduit_concurrency::ConcurrencyController`] rather than run directly,
//! so a single flaky request cannot monopolise every admission slot while it
//! backs off. A `CancellationToken` shared with the originating request is
//! raced against the delay timer: a cancellation while a retry is scheduled
//! aborts the retry instead of letting it fire. `Cancelled` errors from the
//! task itself are never retried — they propagate straight to the caller,
//! per spec §7's error-path rules.

pub mod config;
pub mod events;

pub use config::{RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;

use conduit_concurrency::ConcurrencyController;
use conduit_core::{CancelKind, OrchestrationError};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Bounded re-admission through a [`ConcurrencyController`] with a fixed delay.
pub struct RetryPolicy {
    config: Arc<RetryConfig>,
}

impl Clone for RetryPolicy {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl RetryPolicy {
    pub(crate) fn new(config: RetryConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Runs `task`, re-submitting through `controller` up to `max_attempts`
    /// times with a fixed delay between attempts. `task` receives the
    /// 1-based attempt number, matching the request descriptor's attempt
    /// counter in spec §3.
    ///
    /// A `Cancelled` result from `task` is returned immediately without
    /// retrying. If `cancel_token` fires while a retry is scheduled, the
    /// pending retry is abandoned and a `Cancelled { kind: Manual }` is
    /// returned instead.
    pub async fn run<F, Fut, T, E>(
        &self,
        controller: &ConcurrencyController,
        cancel_token: &CancellationToken,
        mut task: F,
    ) -> Result<T, OrchestrationError<E>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, OrchestrationError<E>>>,
    {
        let mut attempt = 1usize;
        loop {
            let outcome = controller
                .run(|| task(attempt))
                .await
                .map_err(|e| OrchestrationError::Configuration(e.to_string()))?;

            match outcome {
                Ok(value) => {
                    let event = RetryEvent::Success {
                        pattern_name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    };
                    self.config.event_listeners.emit(&event);
                    return Ok(value);
                }
                Err(err) if err.is_cancelled() => {
                    return Err(err);
                }
                Err(err) if attempt >= self.config.max_attempts => {
                    let event = RetryEvent::Exhausted {
                        pattern_name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    };
                    self.config.event_listeners.emit(&event);
                    return Err(err);
                }
                Err(_err) => {
                    let event = RetryEvent::Scheduled {
                        pattern_name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempt: attempt + 1,
                        delay: self.config.delay,
                    };
                    self.config.event_listeners.emit(&event);

                    tokio::select! {
                        _ = tokio::time::sleep(self.config.delay) => {}
                        _ = cancel_token.cancelled() => {
                            let event = RetryEvent::CancelledDuringRetry {
                                pattern_name: self.config.name.clone(),
                                timestamp: Instant::now(),
                                attempt,
                            };
                            self.config.event_listeners.emit(&event);
                            return Err(OrchestrationError::Cancelled { kind: CancelKind::Manual });
                        }
                    }

                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct TestError;

    #[tokio::test]
    async fn succeeds_on_first_attempt_without_retrying() {
        let retry = RetryPolicy::builder().build();
        let controller = ConcurrencyController::builder().unconstrained().build();
        let cancel = CancellationToken::new();

        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let result: Result<i32, OrchestrationError<TestError>> = retry
            .run(&controller, &cancel, |_attempt| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_up_to_max_attempts_then_surfaces_last_error() {
        let retry = RetryPolicy::builder()
            .max_attempts(3)
            .delay(Duration::from_millis(1))
            .build();
        let controller = ConcurrencyController::builder().unconstrained().build();
        let cancel = CancellationToken::new();

        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let result: Result<i32, OrchestrationError<TestError>> = retry
            .run(&controller, &cancel, |_attempt| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(OrchestrationError::transport(TestError))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancelled_errors_are_never_retried() {
        let retry = RetryPolicy::builder().max_attempts(5).build();
        let controller = ConcurrencyController::builder().unconstrained().build();
        let cancel = CancellationToken::new();

        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let result: Result<i32, OrchestrationError<TestError>> = retry
            .run(&controller, &cancel, |_attempt| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(OrchestrationError::Cancelled { kind: CancelKind::Manual })
                }
            })
            .await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_token_aborts_a_pending_retry_delay() {
        let retry = RetryPolicy::builder()
            .max_attempts(5)
            .delay(Duration::from_millis(200))
            .build();
        let controller = ConcurrencyController::builder().unconstrained().build();
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel_clone.cancel();
        });

        let result: Result<i32, OrchestrationError<TestError>> = retry
            .run(&controller, &cancel, |_attempt| async {
                Err(OrchestrationError::transport(TestError))
            })
            .await;

        assert!(matches!(
            result,
            Err(OrchestrationError::Cancelled { kind: CancelKind::Manual })
        ));
    }
}

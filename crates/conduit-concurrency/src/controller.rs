//! The bounded-admission gate described in spec §4.2.

use crate::config::ConcurrencyConfig;
use crate::error::ConcurrencyError;
use crate::events::ConcurrencyEvent;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Bounds the number of tasks running at once to *N*, admitting additional
/// submissions in FIFO order as slots free up.
///
/// `tokio::sync::Semaphore` queues waiters in the order they called
/// `acquire`, which gives the controller its FIFO fairness for free. A
/// `limit` of `None` skips the semaphore entirely: every task runs
/// immediately, matching spec §4.2's `N = +∞` case.
#[derive(Clone)]
pub struct ConcurrencyController {
    semaphore: Option<Arc<Semaphore>>,
    config: Arc<ConcurrencyConfig>,
}

impl ConcurrencyController {
    pub(crate) fn new(config: ConcurrencyConfig) -> Self {
        let semaphore = config.limit.map(|n| Arc::new(Semaphore::new(n)));
        Self {
            semaphore,
            config: Arc::new(config),
        }
    }

    /// Creates a new configuration builder.
    pub fn builder() -> crate::config::ConcurrencyConfigBuilder {
        crate::config::ConcurrencyConfigBuilder::new()
    }

    /// Runs `task`, admitting it immediately if a slot is free, otherwise
    /// queueing it behind earlier submissions. `task` itself may call `run`
    /// again (e.g. a retried request re-submitting) without deadlocking,
    /// since that nested call simply joins the same FIFO queue.
    pub async fn run<F, Fut, T>(&self, task: F) -> Result<T, ConcurrencyError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let Some(semaphore) = &self.semaphore else {
            return Ok(task().await);
        };

        let permit = match self.config.max_wait_duration {
            Some(wait) => {
                // `Semaphore` doesn't expose a waiter count, so queue depth
                // is reported relative to the permits already spoken for.
                if semaphore.available_permits() == 0 {
                    let event = ConcurrencyEvent::Queued {
                        pattern_name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        queue_depth: 0,
                    };
                    self.config.event_listeners.emit(&event);
                }
                match tokio::time::timeout(wait, Arc::clone(semaphore).acquire_owned()).await {
                    Ok(Ok(permit)) => permit,
                    _ => {
                        let limit = self.limit_or_zero();
                        let event = ConcurrencyEvent::Rejected {
                            pattern_name: self.config.name.clone(),
                            timestamp: Instant::now(),
                            limit,
                        };
                        self.config.event_listeners.emit(&event);

                        #[cfg(feature = "metrics")]
                        counter!("conduit_concurrency_rejected_total", "controller" => self.config.name.clone())
                            .increment(1);

                        return Err(ConcurrencyError::AtCapacity { limit });
                    }
                }
            }
            None => {
                if semaphore.available_permits() == 0 {
                    let event = ConcurrencyEvent::Queued {
                        pattern_name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        queue_depth: 0,
                    };
                    self.config.event_listeners.emit(&event);
                }
                Arc::clone(semaphore)
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed")
            }
        };

        let active_calls = self.limit_or_zero() - semaphore.available_permits();
        let admitted = ConcurrencyEvent::Admitted {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            active_calls,
        };
        self.config.event_listeners.emit(&admitted);

        #[cfg(feature = "metrics")]
        {
            counter!("conduit_concurrency_admitted_total", "controller" => self.config.name.clone())
                .increment(1);
            gauge!("conduit_concurrency_active", "controller" => self.config.name.clone())
                .set(active_calls as f64);
        }

        let start = Instant::now();
        let result = task().await;
        drop(permit);

        let duration = start.elapsed();
        let settled = ConcurrencyEvent::Settled {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            duration,
            failed: false,
        };
        self.config.event_listeners.emit(&settled);

        #[cfg(feature = "metrics")]
        {
            let active_after = self.limit_or_zero() - semaphore.available_permits();
            gauge!("conduit_concurrency_active", "controller" => self.config.name.clone())
                .set(active_after as f64);
        }

        Ok(result)
    }

    fn limit_or_zero(&self) -> usize {
        self.config.limit.unwrap_or(0)
    }
}

//! Named, bounded, cancellable periodic polling (spec §4.10).
//!
//! Each `start` spawns a task that submits its work through a shared
//! [`conduit_concurrency::ConcurrencyController`] and reschedules the next
//! iteration `interval` after the previous one *settles*, not after it
//! starts — and only if the task has not been stopped in the meantime. A
//! stopped task must never invoke a callback after `stop` returns, which is
//! why the stopped flag (a `CancellationToken`) is checked both before
//! invoking the task and before scheduling the next wait, matching spec
//! §9's note that earlier revisions rescheduled unconditionally inside a
//! `finally` block.

pub mod config;
pub mod events;

pub use config::{PollingConfig, PollingConfigBuilder};
pub use events::PollingEvent;

use conduit_concurrency::ConcurrencyController;
use conduit_core::EventListeners;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

struct Entry {
    cancel: CancellationToken,
    marker: Arc<()>,
}

/// Schedules named periodic tasks, each with its own bounded attempt count.
pub struct PollingScheduler<T, E> {
    concurrency: ConcurrencyController,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    _marker: std::marker::PhantomData<fn() -> (T, E)>,
}

impl<T, E> Clone for PollingScheduler<T, E> {
    fn clone(&self) -> Self {
        Self {
            concurrency: self.concurrency.clone(),
            entries: Arc::clone(&self.entries),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T, E> Default for PollingScheduler<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> PollingScheduler<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Creates a scheduler whose tasks run unconstrained with respect to
    /// each other (each `start` call owns its own schedule; bound overall
    /// concurrency by sharing a configured [`ConcurrencyController`] via
    /// [`Self::with_concurrency`] instead).
    pub fn new() -> Self {
        Self::with_concurrency(ConcurrencyController::builder().unconstrained().build())
    }

    /// Creates a scheduler whose iterations are submitted through `concurrency`.
    pub fn with_concurrency(concurrency: ConcurrencyController) -> Self {
        Self {
            concurrency,
            entries: Arc::new(Mutex::new(HashMap::new())),
            _marker: std::marker::PhantomData,
        }
    }

    /// Starts a named polling task, stopping any existing task registered
    /// under the same key first.
    pub fn start(&self, key: impl Into<String>, config: PollingConfig<T, E>) {
        let key = key.into();
        self.stop(&key);

        let cancel = CancellationToken::new();
        let marker = Arc::new(());
        {
            let mut entries = self.entries.lock().unwrap();
            entries.insert(
                key.clone(),
                Entry {
                    cancel: cancel.clone(),
                    marker: Arc::clone(&marker),
                },
            );
        }

        let event_listeners: Arc<EventListeners<PollingEvent>> =
            Arc::new(config.event_listeners.clone());
        event_listeners.emit(&PollingEvent::Started {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            key: key.clone(),
        });

        let concurrency = self.concurrency.clone();
        let entries = Arc::clone(&self.entries);
        let PollingConfig {
            interval,
            max_polling_times,
            task,
            on_success,
            on_error,
            name,
            ..
        } = config;

        tokio::spawn(async move {
            let mut attempt = 1usize;
            loop {
                if cancel.is_cancelled() {
                    break;
                }

                event_listeners.emit(&PollingEvent::Invoked {
                    pattern_name: name.clone(),
                    timestamp: Instant::now(),
                    key: key.clone(),
                    attempt,
                });

                let task = Arc::clone(&task);
                let outcome = concurrency.run(|| task(attempt)).await;

                if cancel.is_cancelled() {
                    break;
                }

                match outcome {
                    Ok(Ok(value)) => {
                        if let Some(callback) = &on_success {
                            callback(value);
                        }
                    }
                    Ok(Err(error)) => {
                        if let Some(callback) = &on_error {
                            callback(error);
                        }
                    }
                    Err(_rejected) => {
                        // The controller only rejects past a configured
                        // `max_wait_duration`; treat it like any other
                        // failed iteration rather than stopping the series.
                    }
                }

                if attempt >= max_polling_times {
                    event_listeners.emit(&PollingEvent::Exhausted {
                        pattern_name: name.clone(),
                        timestamp: Instant::now(),
                        key: key.clone(),
                        attempts: attempt,
                    });
                    break;
                }

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = cancel.cancelled() => break,
                }

                attempt += 1;
            }

            let mut entries = entries.lock().unwrap();
            if entries
                .get(&key)
                .is_some_and(|entry| Arc::ptr_eq(&entry.marker, &marker))
            {
                entries.remove(&key);
            }
        });
    }

    /// Stops the task registered under `key`, if any. Idempotent: stopping
    /// an unknown or already-stopped key is a no-op.
    pub fn stop(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.remove(key) {
            entry.cancel.cancel();
        }
    }

    /// Returns true if a task is currently registered under `key`.
    pub fn is_running(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

//! Configuration for a single named polling task.

use crate::events::PollingEvent;
use conduit_core::{EventListeners, FnListener};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// One polling iteration: attempt number in, `Result<T, E>` out.
pub type PollTask<T, E> =
    Arc<dyn Fn(usize) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send>> + Send + Sync>;
pub type SuccessCallback<T> = Arc<dyn Fn(T) + Send + Sync>;
pub type ErrorCallback<E> = Arc<dyn Fn(E) + Send + Sync>;

/// Configuration for one [`crate::PollingScheduler::start`] call.
pub struct PollingConfig<T, E> {
    pub(crate) interval: Duration,
    pub(crate) max_polling_times: usize,
    pub(crate) task: PollTask<T, E>,
    pub(crate) on_success: Option<SuccessCallback<T>>,
    pub(crate) on_error: Option<ErrorCallback<E>>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<PollingEvent>,
}

impl<T, E> PollingConfig<T, E> {
    /// Creates a new configuration builder.
    pub fn builder() -> PollingConfigBuilder<T, E> {
        PollingConfigBuilder::new()
    }
}

/// Builder for [`PollingConfig`].
pub struct PollingConfigBuilder<T, E> {
    interval: Duration,
    max_polling_times: usize,
    task: Option<PollTask<T, E>>,
    on_success: Option<SuccessCallback<T>>,
    on_error: Option<ErrorCallback<E>>,
    name: String,
    event_listeners: EventListeners<PollingEvent>,
}

impl<T, E> PollingConfigBuilder<T, E> {
    pub fn new() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_polling_times: usize::MAX,
            task: None,
            on_success: None,
            on_error: None,
            name: "polling".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the delay awaited after an iteration settles before the next runs.
    ///
    /// Default: 1s
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bounds the total number of iterations.
    ///
    /// Default: unbounded
    pub fn max_polling_times(mut self, max_polling_times: usize) -> Self {
        self.max_polling_times = max_polling_times.max(1);
        self
    }

    /// Sets the per-iteration task, submitted through the
    /// [`conduit_concurrency::ConcurrencyController`] on each attempt.
    pub fn task<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.task = Some(Arc::new(move |attempt| Box::pin(f(attempt))));
        self
    }

    /// Registers a callback invoked with each successful iteration's result.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(f));
        self
    }

    /// Registers a callback invoked with each failed iteration's error.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Sets the name of this polling task for observability.
    ///
    /// Default: "polling"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builds the configuration. Panics if `task` was never set.
    pub fn build(self) -> PollingConfig<T, E> {
        PollingConfig {
            interval: self.interval,
            max_polling_times: self.max_polling_times,
            task: self.task.expect("polling config requires a task"),
            on_success: self.on_success,
            on_error: self.on_error,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl<T, E> Default for PollingConfigBuilder<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

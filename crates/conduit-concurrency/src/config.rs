//! Configuration for the concurrency controller.

use crate::events::ConcurrencyEvent;
use conduit_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a [`crate::ConcurrencyController`].
#[derive(Clone)]
pub struct ConcurrencyConfig {
    /// Maximum number of tasks that may run at once. `None` means unbounded
    /// (an unconstrained pass-through, per §4.2's `N = +∞` case).
    pub(crate) limit: Option<usize>,
    /// Maximum time a task may wait in the FIFO queue before it is rejected.
    /// `None` means wait indefinitely.
    pub(crate) max_wait_duration: Option<Duration>,
    /// Name of this controller instance, used in events and metrics labels.
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<ConcurrencyEvent>,
}

impl ConcurrencyConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ConcurrencyConfigBuilder {
        ConcurrencyConfigBuilder::new()
    }
}

/// Builder for [`ConcurrencyConfig`].
pub struct ConcurrencyConfigBuilder {
    limit: Option<usize>,
    max_wait_duration: Option<Duration>,
    name: String,
    event_listeners: EventListeners<ConcurrencyEvent>,
}

impl ConcurrencyConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            limit: Some(25),
            max_wait_duration: None,
            name: "concurrency".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the bound *N* on simultaneously active tasks.
    ///
    /// Default: 25
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Removes the bound entirely: every submitted task runs immediately.
    pub fn unconstrained(mut self) -> Self {
        self.limit = None;
        self
    }

    /// Sets the maximum time a queued task waits for a slot before being rejected.
    ///
    /// If `None`, queued tasks wait indefinitely.
    /// Default: None
    pub fn max_wait_duration(mut self, duration: Option<Duration>) -> Self {
        self.max_wait_duration = duration;
        self
    }

    /// Sets the name of this controller instance.
    ///
    /// Default: "concurrency"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a task is admitted and starts running.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - the number of active tasks after this admission.
    pub fn on_admitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ConcurrencyEvent::Admitted { active_calls, .. } = event {
                f(*active_calls);
            }
        }));
        self
    }

    /// Registers a callback invoked when a task is rejected after waiting
    /// longer than `max_wait_duration`.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - the configured limit that was at capacity.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ConcurrencyEvent::Rejected { limit, .. } = event {
                f(*limit);
            }
        }));
        self
    }

    /// Registers a callback invoked when a task is queued behind others.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - the number of tasks ahead of this one.
    pub fn on_queued<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ConcurrencyEvent::Queued { queue_depth, .. } = event {
                f(*queue_depth);
            }
        }));
        self
    }

    /// Registers a callback invoked when an admitted task settles (success or failure).
    ///
    /// # Callback Signature
    /// `Fn(Duration, bool)` - elapsed time since admission, and whether the task failed.
    pub fn on_settled<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration, bool) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ConcurrencyEvent::Settled {
                duration, failed, ..
            } = event
            {
                f(*duration, *failed);
            }
        }));
        self
    }

    /// Builds the controller.
    pub fn build(self) -> crate::controller::ConcurrencyController {
        let config = ConcurrencyConfig {
            limit: self.limit,
            max_wait_duration: self.max_wait_duration,
            name: self.name,
            event_listeners: self.event_listeners,
        };
        crate::controller::ConcurrencyController::new(config)
    }
}

impl Default for ConcurrencyConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

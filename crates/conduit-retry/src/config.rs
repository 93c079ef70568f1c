//! Configuration for the retry policy.

use crate::events::RetryEvent;
use conduit_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a [`crate::RetryPolicy`].
pub struct RetryConfig {
    pub(crate) max_attempts: usize,
    pub(crate) delay: Duration,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    max_attempts: usize,
    delay: Duration,
    name: String,
    event_listeners: EventListeners<RetryEvent>,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
            name: "retry".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the maximum number of attempts (the first try plus retries).
    ///
    /// Default: 3
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the fixed delay awaited between attempts.
    ///
    /// Default: 500ms
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the name of this retry policy instance for observability.
    ///
    /// Default: "retry"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked each time a retry is scheduled.
    ///
    /// # Callback Signature
    /// `Fn(usize, Duration)` - the attempt number about to run, and the delay awaited before it.
    pub fn on_scheduled<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Scheduled { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked when all attempts are exhausted.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - the total number of attempts made.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Builds the retry policy.
    pub fn build(self) -> crate::RetryPolicy {
        crate::RetryPolicy::new(RetryConfig {
            max_attempts: self.max_attempts,
            delay: self.delay,
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Configuration for the coalescer.

use crate::events::CoalesceEvent;
use conduit_core::{EventListeners, FnListener};

/// Configuration for a [`crate::Coalescer`].
pub struct CoalesceConfig {
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<CoalesceEvent>,
}

/// Builder for [`CoalesceConfig`].
pub struct CoalesceConfigBuilder {
    name: String,
    event_listeners: EventListeners<CoalesceEvent>,
}

impl CoalesceConfigBuilder {
    pub fn new() -> Self {
        Self {
            name: "coalescer".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name of this coalescer instance for observability.
    ///
    /// Default: "coalescer"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked each time a debounced call fires (reaches quiescence).
    pub fn on_debounce_fired<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CoalesceEvent::DebounceFired { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a callback invoked each time a pending debounce is superseded.
    pub fn on_debounce_superseded<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CoalesceEvent::DebounceSuperseded { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a callback invoked each time a throttled call is rejected.
    pub fn on_throttle_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CoalesceEvent::ThrottleRejected { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Builds the coalescer.
    pub fn build(self) -> crate::Coalescer {
        crate::Coalescer::new(CoalesceConfig {
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }
}

impl Default for CoalesceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

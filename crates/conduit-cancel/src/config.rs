//! Configuration for the cancel registry.

use crate::events::CancelEvent;
use conduit_core::{EventListeners, FnListener};

/// Configuration for a [`crate::CancelRegistry`].
pub struct CancelConfig {
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<CancelEvent>,
}

/// Builder for [`CancelConfig`].
pub struct CancelConfigBuilder {
    name: String,
    event_listeners: EventListeners<CancelEvent>,
}

impl CancelConfigBuilder {
    pub fn new() -> Self {
        Self {
            name: "cancel".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name of this registry instance for observability.
    ///
    /// Default: "cancel"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked each time a handle is registered.
    ///
    /// # Callback Signature
    /// `Fn(&str)` - the id the handle was registered under.
    pub fn on_registered<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CancelEvent::Registered { id, .. } = event {
                f(id);
            }
        }));
        self
    }

    /// Registers a callback invoked each time a handle is cancelled.
    ///
    /// # Callback Signature
    /// `Fn(&str)` - the id that was cancelled.
    pub fn on_cancelled<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CancelEvent::Cancelled { id, .. } = event {
                f(id);
            }
        }));
        self
    }

    /// Builds the registry.
    pub fn build(self) -> crate::CancelRegistry {
        crate::CancelRegistry::new(CancelConfig {
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }
}

impl Default for CancelConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

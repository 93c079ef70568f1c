//! Configuration for the cache.

use crate::events::CacheEvent;
use conduit_core::{EventListeners, FnListener};

/// Configuration for a [`crate::Cache`].
pub struct CacheConfig {
    pub(crate) capacity: Option<usize>,
    pub(crate) event_listeners: EventListeners<CacheEvent>,
    pub(crate) name: String,
}

/// Builder for [`CacheConfig`].
pub struct CacheConfigBuilder {
    capacity: Option<usize>,
    event_listeners: EventListeners<CacheEvent>,
    name: String,
}

impl CacheConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            capacity: None,
            event_listeners: EventListeners::new(),
            name: String::from("cache"),
        }
    }

    /// Caps the number of entries, evicting the oldest insertion (FIFO) once
    /// full. Unset means unbounded — entries are removed only by TTL expiry
    /// or `clear()`, matching spec §4.3's Design Notes.
    ///
    /// Default: unbounded
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Sets the name of this cache instance for observability.
    ///
    /// Default: "cache"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked on every cache hit.
    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CacheEvent::Hit { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a callback invoked on every cache miss (absent or expired).
    pub fn on_miss<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CacheEvent::Miss { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a capacity-bounded store evicts
    /// an entry to make room for a new one.
    pub fn on_eviction<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CacheEvent::Eviction { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Builds the cache. `V` is inferred from how the returned [`crate::Cache`] is used.
    pub fn build<V: Clone + Send + 'static>(self) -> crate::Cache<V> {
        let config = CacheConfig {
            capacity: self.capacity,
            event_listeners: self.event_listeners,
            name: self.name,
        };
        crate::Cache::new(config)
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::Cache;

    #[test]
    fn builder_defaults_do_not_panic() {
        let _cache: Cache<String> = Cache::builder().build();
    }

    #[test]
    fn builder_accepts_custom_values() {
        let _cache: Cache<String> = Cache::builder()
            .capacity(500)
            .name("my-cache")
            .on_hit(|_| {})
            .on_miss(|_| {})
            .on_eviction(|_| {})
            .build();
    }
}

//! The response cache described in spec §4.3.
//!
//! Keyed by [`conduit_core::request_key`], with a per-entry TTL: `get`
//! returns the value iff it hasn't expired, otherwise the entry is removed
//! and reported as a miss. The cache never inspects or mutates bodies — it
//! is a dumb keyed store, with the pipeline responsible for deciding when
//! a hit should be synthesised as a successful response.
//!
//! # Example
//!
//! ```rust
//! use conduit_cache::Cache;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let cache: Cache<String> = Cache::builder().name("responses").build();
//!
//! cache.set("GET:/x:{}:null".to_string(), "body".to_string(), Some(Duration::from_secs(30)));
//! assert_eq!(cache.get("GET:/x:{}:null"), Some("body".to_string()));
//! # }
//! ```

mod config;
mod events;
mod eviction;
mod store;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use events::CacheEvent;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use store::CacheStore;

/// Keyed store of response bodies with per-entry TTL and explicit invalidation.
pub struct Cache<V> {
    config: Arc<CacheConfig>,
    store: Arc<Mutex<CacheStore<V>>>,
}

impl<V: Clone + Send + 'static> Cache<V> {
    pub(crate) fn new(config: CacheConfig) -> Self {
        let store = Arc::new(Mutex::new(CacheStore::new(config.capacity)));
        Self {
            config: Arc::new(config),
            store,
        }
    }

    /// Creates a new configuration builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    /// Returns the cached value for `key`, or `None` on a miss or expiry.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut store = self.store.lock().unwrap();
        let result = store.get(key);

        let event = if result.is_some() {
            CacheEvent::Hit {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
            }
        } else {
            CacheEvent::Miss {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
            }
        };
        self.config.event_listeners.emit(&event);

        result
    }

    /// Stores `value` under `key` with an optional TTL. Absent TTL means the
    /// entry never expires on its own.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let evicted = {
            let mut store = self.store.lock().unwrap();
            store.insert(key.clone(), value, ttl)
        };

        let write_event = CacheEvent::Write {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            key,
        };
        self.config.event_listeners.emit(&write_event);

        if let Some(evicted_key) = evicted {
            let event = CacheEvent::Eviction {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                key: evicted_key,
            };
            self.config.event_listeners.emit(&event);
        }
    }

    /// Empties the store.
    pub fn clear(&self) {
        self.store.lock().unwrap().clear();
    }

    /// Returns the current number of live entries (expired-but-unaccessed
    /// entries still count until their next `get`).
    pub fn len(&self) -> usize {
        self.store.lock().unwrap().len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
        }
    }
}

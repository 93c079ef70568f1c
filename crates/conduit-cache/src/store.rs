//! Cache storage implementation.

use crate::eviction::FifoStore;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A stored value and its absolute expiry, per spec §3's "Cache entry"
/// shape: `{ body, expires-at (absolute instant or infinity) }`.
#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if Instant::now() >= at)
    }
}

enum Backing<V> {
    Unbounded(HashMap<String, CacheEntry<V>>),
    Bounded(FifoStore<String, CacheEntry<V>>),
}

/// Keyed store with per-entry TTL and an optional FIFO capacity bound.
pub(crate) struct CacheStore<V> {
    backing: Backing<V>,
}

impl<V: Clone> CacheStore<V> {
    pub(crate) fn new(capacity: Option<usize>) -> Self {
        let backing = match capacity {
            Some(cap) => Backing::Bounded(FifoStore::new(cap)),
            None => Backing::Unbounded(HashMap::new()),
        };
        Self { backing }
    }

    /// Returns the value if present and not expired. An expired entry is
    /// removed as a side effect (lazy expiry, per spec §4.3).
    pub(crate) fn get(&mut self, key: &str) -> Option<V> {
        let expired = match &self.backing {
            Backing::Unbounded(map) => map.get(key).is_some_and(CacheEntry::is_expired),
            Backing::Bounded(store) => store.get(&key.to_string()).is_some_and(CacheEntry::is_expired),
        };

        if expired {
            self.remove(key);
            return None;
        }

        match &self.backing {
            Backing::Unbounded(map) => map.get(key).map(|e| e.value.clone()),
            Backing::Bounded(store) => store.get(&key.to_string()).map(|e| e.value.clone()),
        }
    }

    /// Inserts `value` under `key` with an optional TTL. Returns the key
    /// evicted to make room, if the store is capacity-bounded and full.
    pub(crate) fn insert(&mut self, key: String, value: V, ttl: Option<Duration>) -> Option<String> {
        let entry = CacheEntry {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        };
        match &mut self.backing {
            Backing::Unbounded(map) => {
                map.insert(key, entry);
                None
            }
            Backing::Bounded(store) => store.insert(key, entry).map(|(k, _)| k),
        }
    }

    fn remove(&mut self, key: &str) {
        match &mut self.backing {
            Backing::Unbounded(map) => {
                map.remove(key);
            }
            Backing::Bounded(store) => {
                store.remove(&key.to_string());
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        match &self.backing {
            Backing::Unbounded(map) => map.len(),
            Backing::Bounded(store) => store.len(),
        }
    }

    pub(crate) fn clear(&mut self) {
        match &mut self.backing {
            Backing::Unbounded(map) => map.clear(),
            Backing::Bounded(store) => store.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn unbounded_basic_roundtrip() {
        let mut store: CacheStore<String> = CacheStore::new(None);
        store.insert("key1".into(), "value1".into(), None);
        assert_eq!(store.get("key1"), Some("value1".to_string()));
        assert_eq!(store.get("key2"), None);
    }

    #[test]
    fn absent_ttl_never_expires() {
        let mut store: CacheStore<&'static str> = CacheStore::new(None);
        store.insert("key1".into(), "value1", None);
        sleep(Duration::from_millis(20));
        assert_eq!(store.get("key1"), Some("value1"));
    }

    #[test]
    fn ttl_expiry_is_lazy_and_removes_on_access() {
        let mut store: CacheStore<&'static str> = CacheStore::new(None);
        store.insert("key1".into(), "value1", Some(Duration::from_millis(20)));
        assert_eq!(store.get("key1"), Some("value1"));
        sleep(Duration::from_millis(30));
        assert_eq!(store.get("key1"), None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn bounded_store_evicts_fifo() {
        let mut store: CacheStore<i32> = CacheStore::new(Some(2));
        store.insert("a".into(), 1, None);
        store.insert("b".into(), 2, None);
        let evicted = store.insert("c".into(), 3, None);
        assert_eq!(evicted, Some("a".to_string()));
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), Some(2));
        assert_eq!(store.get("c"), Some(3));
    }

    #[test]
    fn clear_empties_the_store() {
        let mut store: CacheStore<i32> = CacheStore::new(None);
        store.insert("a".into(), 1, None);
        store.insert("b".into(), 2, None);
        assert_eq!(store.len(), 2);
        store.clear();
        assert_eq!(store.len(), 0);
        assert_eq!(store.get("a"), None);
    }
}

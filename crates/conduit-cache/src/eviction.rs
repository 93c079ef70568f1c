//! Optional capacity bound for the cache store.
//!
//! Per spec §4.3's Design Notes, the response cache does not need LRU: only
//! TTL expiry and `clear()` are required, plus an optional FIFO-by-insertion
//! cap when a bound is desired.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// First-in-first-out bounded map. Inserting past `capacity` evicts the
/// oldest surviving key regardless of how often it has been read.
pub(crate) struct FifoStore<K, V> {
    data: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> FifoStore<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            data: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        self.data.get(key)
    }

    /// Inserts `value`, returning the evicted `(key, value)` if the store
    /// was at capacity.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.data.contains_key(&key) {
            let old = self.data.insert(key.clone(), value)?;
            return Some((key, old));
        }

        let evicted = if self.data.len() >= self.capacity {
            self.order
                .pop_front()
                .and_then(|old_key| self.data.remove(&old_key).map(|v| (old_key, v)))
        } else {
            None
        };

        self.data.insert(key.clone(), value);
        self.order.push_back(key);
        evicted
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        self.order.retain(|k| k != key);
        self.data.remove(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_insertion_regardless_of_access() {
        let mut store = FifoStore::new(2);

        store.insert("a", 1);
        store.insert("b", 2);
        store.get(&"b");
        store.get(&"b");

        let evicted = store.insert("c", 3);
        assert_eq!(evicted, Some(("a", 1)));

        assert_eq!(store.get(&"a"), None);
        assert_eq!(store.get(&"b"), Some(&2));
        assert_eq!(store.get(&"c"), Some(&3));
    }
}

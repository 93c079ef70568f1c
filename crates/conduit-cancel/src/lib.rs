//! Named cancellation handles described in spec §4.8.
//!
//! Every in-flight request that can be cancelled by caller-supplied id
//! registers a [`tokio_util::sync::CancellationToken`] here under that id.
//! `cancel-by-id` fires the token and removes the entry; `cancel-all` fires
//! and drops every entry at once. Registering twice under the same id
//! replaces the prior handle without cancelling it — the caller is
//! responsible for not orphaning a request that way. Request completion
//! removes the entry via `delete` regardless of how the request ended.

pub mod config;
pub mod events;

pub use config::{CancelConfig, CancelConfigBuilder};
pub use events::CancelEvent;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// A registry of named, independently cancellable request handles.
pub struct CancelRegistry {
    config: Arc<CancelConfig>,
    handles: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl Clone for CancelRegistry {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            handles: Arc::clone(&self.handles),
        }
    }
}

impl CancelRegistry {
    pub(crate) fn new(config: CancelConfig) -> Self {
        Self {
            config: Arc::new(config),
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates a new configuration builder.
    pub fn builder() -> CancelConfigBuilder {
        CancelConfigBuilder::new()
    }

    /// Registers `token` under `id`, replacing any prior handle with the
    /// same id. The prior token is simply dropped, not cancelled.
    pub fn set(&self, id: impl Into<String>, token: CancellationToken) {
        let id = id.into();
        self.handles.lock().unwrap().insert(id.clone(), token);
        let event = CancelEvent::Registered {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            id,
        };
        self.config.event_listeners.emit(&event);
    }

    /// Returns a clone of the token registered under `id`, if any.
    pub fn get(&self, id: &str) -> Option<CancellationToken> {
        self.handles.lock().unwrap().get(id).cloned()
    }

    /// Removes the handle registered under `id` without cancelling it.
    /// Called on request completion regardless of outcome.
    pub fn delete(&self, id: &str) {
        let removed = self.handles.lock().unwrap().remove(id);
        if removed.is_some() {
            let event = CancelEvent::Removed {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                id: id.to_string(),
            };
            self.config.event_listeners.emit(&event);
        }
    }

    /// Fires and removes the handle registered under `id`. Returns `true`
    /// if a handle was found.
    pub fn cancel_by_id(&self, id: &str) -> bool {
        let removed = self.handles.lock().unwrap().remove(id);
        match removed {
            Some(token) => {
                token.cancel();
                let event = CancelEvent::Cancelled {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    id: id.to_string(),
                };
                self.config.event_listeners.emit(&event);
                true
            }
            None => false,
        }
    }

    /// Fires and removes every currently registered handle. Returns the
    /// number of handles cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<(String, CancellationToken)> =
            self.handles.lock().unwrap().drain().collect();
        let count = drained.len();
        for (id, token) in drained {
            token.cancel();
            let event = CancelEvent::Cancelled {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                id,
            };
            self.config.event_listeners.emit(&event);
        }
        count
    }

    /// Returns the number of currently registered handles.
    pub fn len(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    /// Returns `true` if no handles are currently registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_returns_the_same_token() {
        let registry = CancelRegistry::builder().build();
        let token = CancellationToken::new();
        registry.set("req-1", token.clone());

        let fetched = registry.get("req-1").expect("handle should exist");
        assert!(!fetched.is_cancelled());
        token.cancel();
        assert!(fetched.is_cancelled());
    }

    #[test]
    fn registering_twice_replaces_the_prior_handle() {
        let registry = CancelRegistry::builder().build();
        let first = CancellationToken::new();
        let second = CancellationToken::new();

        registry.set("req-1", first.clone());
        registry.set("req-1", second.clone());

        assert_eq!(registry.len(), 1);
        registry.cancel_by_id("req-1");
        assert!(second.is_cancelled());
        assert!(!first.is_cancelled());
    }

    #[test]
    fn cancel_by_id_fires_the_token_and_removes_the_entry() {
        let registry = CancelRegistry::builder().build();
        let token = CancellationToken::new();
        registry.set("req-1", token.clone());

        assert!(registry.cancel_by_id("req-1"));
        assert!(token.is_cancelled());
        assert!(registry.get("req-1").is_none());
    }

    #[test]
    fn cancel_by_id_on_unknown_id_returns_false() {
        let registry = CancelRegistry::builder().build();
        assert!(!registry.cancel_by_id("missing"));
    }

    #[test]
    fn delete_removes_without_cancelling() {
        let registry = CancelRegistry::builder().build();
        let token = CancellationToken::new();
        registry.set("req-1", token.clone());

        registry.delete("req-1");
        assert!(!token.is_cancelled());
        assert!(registry.get("req-1").is_none());
    }

    #[test]
    fn cancel_all_fires_every_handle_and_empties_the_registry() {
        let registry = CancelRegistry::builder().build();
        let a = CancellationToken::new();
        let b = CancellationToken::new();
        registry.set("a", a.clone());
        registry.set("b", b.clone());

        assert_eq!(registry.cancel_all(), 2);
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert!(registry.is_empty());
    }

    #[test]
    fn event_listeners_observe_registration_and_cancellation() {
        let registered = Arc::new(Mutex::new(Vec::new()));
        let cancelled = Arc::new(Mutex::new(Vec::new()));
        let r = Arc::clone(&registered);
        let c = Arc::clone(&cancelled);

        let registry = CancelRegistry::builder()
            .on_registered(move |id| r.lock().unwrap().push(id.to_string()))
            .on_cancelled(move |id| c.lock().unwrap().push(id.to_string()))
            .build();

        registry.set("req-1", CancellationToken::new());
        registry.cancel_by_id("req-1");

        assert_eq!(*registered.lock().unwrap(), vec!["req-1".to_string()]);
        assert_eq!(*cancelled.lock().unwrap(), vec!["req-1".to_string()]);
    }
}

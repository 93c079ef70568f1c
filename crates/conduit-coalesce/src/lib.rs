//! The per-key debounce/throttle coalescer described in spec §4.4.
//!
//! Two independent mechanisms, both keyed by [`conduit_core::request_key`]:
//!
//! - **Debounce (trailing, cancelling).** `debounce(key, delay)` resolves
//!   after `delay` of quiescence on that key. A later call on the same key
//!   supersedes the pending one, which is rejected with
//!   `CancelKind::Debounce`.
//! - **Throttle (leading).** `throttle(key, interval)` resolves immediately
//!   if `interval` has elapsed since the key last fired, otherwise rejects
//!   with `CancelKind::Throttle` without suspending.
//!
//! Per spec §5's scheduling model, every pipeline stage (including this one)
//! runs its state transitions on one logical thread of control; the only
//! true suspension points are awaits on timers, the transport, or a ticket.
//! `debounce` relies on that discipline: when a later call supersedes an
//! earlier one, it simply removes the earlier call's slot from the map and
//! wakes it directly, with no risk of the two racing over the same entry.

pub mod config;
pub mod events;

pub use config::{CoalesceConfig, CoalesceConfigBuilder};
pub use events::CoalesceEvent;

use conduit_core::CancelKind;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Per-key debounce and throttle state, per spec §3's "Coalescer state".
pub struct Coalescer {
    config: Arc<CoalesceConfig>,
    debounce_slots: Arc<Mutex<HashMap<String, oneshot::Sender<CancelKind>>>>,
    throttle_last_fire: Arc<Mutex<HashMap<String, Instant>>>,
}

impl Clone for Coalescer {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            debounce_slots: Arc::clone(&self.debounce_slots),
            throttle_last_fire: Arc::clone(&self.throttle_last_fire),
        }
    }
}

impl Coalescer {
    pub(crate) fn new(config: CoalesceConfig) -> Self {
        Self {
            config: Arc::new(config),
            debounce_slots: Arc::new(Mutex::new(HashMap::new())),
            throttle_last_fire: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates a new configuration builder.
    pub fn builder() -> CoalesceConfigBuilder {
        CoalesceConfigBuilder::new()
    }

    /// Waits for `delay` of quiescence on `key`. Returns `Ok(())` once fired,
    /// or `Err(CancelKind::Debounce)` if a later call on the same key arrived
    /// first.
    pub async fn debounce(&self, key: impl Into<String>, delay: Duration) -> Result<(), CancelKind> {
        let key = key.into();
        let (tx, rx) = oneshot::channel();
        {
            let mut slots = self.debounce_slots.lock().unwrap();
            if let Some(prev_tx) = slots.insert(key.clone(), tx) {
                let _ = prev_tx.send(CancelKind::Debounce);
                let event = CoalesceEvent::DebounceSuperseded {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    key: key.clone(),
                };
                self.config.event_listeners.emit(&event);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                self.debounce_slots.lock().unwrap().remove(&key);
                let event = CoalesceEvent::DebounceFired {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    key,
                };
                self.config.event_listeners.emit(&event);
                Ok(())
            }
            kind = rx => {
                Err(kind.unwrap_or(CancelKind::ManagerCleared))
            }
        }
    }

    /// Admits `key` immediately if `interval` has elapsed since it last
    /// fired (updating the last-fire time), otherwise rejects without
    /// suspending.
    pub fn throttle(&self, key: impl Into<String>, interval: Duration) -> Result<(), CancelKind> {
        let key = key.into();
        let now = Instant::now();
        let mut last_fire = self.throttle_last_fire.lock().unwrap();

        let admitted = match last_fire.get(&key) {
            Some(&last) => now.duration_since(last) >= interval,
            None => true,
        };

        let event = if admitted {
            last_fire.insert(key.clone(), now);
            CoalesceEvent::ThrottleAdmitted {
                pattern_name: self.config.name.clone(),
                timestamp: now,
                key,
            }
        } else {
            CoalesceEvent::ThrottleRejected {
                pattern_name: self.config.name.clone(),
                timestamp: now,
                key,
            }
        };
        self.config.event_listeners.emit(&event);

        if admitted {
            Ok(())
        } else {
            Err(CancelKind::Throttle)
        }
    }

    /// Rejects every pending debounce future with `CancelKind::ManagerCleared`
    /// and clears all throttle state.
    pub fn clear(&self) {
        let pending: Vec<_> = self.debounce_slots.lock().unwrap().drain().collect();
        for (_, tx) in pending {
            let _ = tx.send(CancelKind::ManagerCleared);
        }
        self.throttle_last_fire.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn debounce_resolves_after_quiescence() {
        let coalescer = Coalescer::builder().build();
        let result = coalescer.debounce("k", Duration::from_millis(20)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn later_debounce_cancels_earlier_one() {
        let coalescer = Coalescer::builder().build();

        let first = {
            let coalescer = coalescer.clone();
            tokio::spawn(async move { coalescer.debounce("k", Duration::from_millis(50)).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = coalescer.debounce("k", Duration::from_millis(20));

        let (first_result, second_result) = tokio::join!(first, second);
        assert_eq!(first_result.unwrap(), Err(CancelKind::Debounce));
        assert!(second_result.is_ok());
    }

    #[tokio::test]
    async fn five_debounced_calls_leave_exactly_one_survivor() {
        let coalescer = Coalescer::builder().build();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let coalescer = coalescer.clone();
            handles.push(tokio::spawn(async move {
                coalescer.debounce("k", Duration::from_millis(40)).await
            }));
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let last = coalescer.debounce("k", Duration::from_millis(40));

        let mut cancelled = 0;
        for handle in handles {
            if handle.await.unwrap() == Err(CancelKind::Debounce) {
                cancelled += 1;
            }
        }
        assert_eq!(cancelled, 4);
        assert!(last.await.is_ok());
    }

    #[test]
    fn throttle_admits_first_call_then_rejects_within_interval() {
        let coalescer = Coalescer::builder().build();
        assert!(coalescer.throttle("k", Duration::from_secs(60)).is_ok());
        assert_eq!(
            coalescer.throttle("k", Duration::from_secs(60)),
            Err(CancelKind::Throttle)
        );
    }

    #[test]
    fn throttle_admits_again_after_interval_elapses() {
        let coalescer = Coalescer::builder().build();
        assert!(coalescer.throttle("k", Duration::from_millis(10)).is_ok());
        std::thread::sleep(Duration::from_millis(15));
        assert!(coalescer.throttle("k", Duration::from_millis(10)).is_ok());
    }

    #[tokio::test]
    async fn clear_cancels_pending_debounce_with_manager_cleared() {
        let coalescer = Coalescer::builder().build();
        let pending = {
            let coalescer = coalescer.clone();
            tokio::spawn(async move { coalescer.debounce("k", Duration::from_secs(60)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        coalescer.clear();
        assert_eq!(pending.await.unwrap(), Err(CancelKind::ManagerCleared));
    }
}

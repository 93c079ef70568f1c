//! Single-flight dual-token refresh (spec §4.6).
//!
//! Grounded on `tower-resilience-coalesce`'s leader/waiter `InFlight`
//! structure (a map from key to a `broadcast::Sender` that late joiners
//! subscribe to), narrowed to a single global ticket rather than a
//! per-key map: this controller only ever refreshes one token, so there is
//! exactly one ticket, not one per request key.

use crate::events::RefreshEvent;
use conduit_core::{EventListeners, FnListener};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::broadcast;

/// `Fn() -> future<Result<new_token, failure_message>>`.
pub type RefreshFn =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<String, String>> + Send>> + Send + Sync>;

/// What the RefreshController decided after observing a response code.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// The code isn't in either expiry set; nothing to do.
    NotApplicable,
    /// A refresh-expired code was observed. Terminal.
    RefreshExpired,
    /// The request had already been retried once after a refresh.
    AlreadyRetriedAfterRefresh,
    /// A fresh access token is available; re-send with it.
    NewToken(String),
    /// The refresh itself failed (missing function, empty token, or the
    /// function's own error).
    ConfigurationError(String),
}

pub struct RefreshConfig {
    pub(crate) refresh_access_token: Option<RefreshFn>,
    pub(crate) access_expired_codes: HashSet<i64>,
    pub(crate) refresh_expired_codes: HashSet<i64>,
    pub(crate) on_refresh_expired: Option<Arc<dyn Fn() + Send + Sync>>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RefreshEvent>,
}

pub struct RefreshConfigBuilder {
    refresh_access_token: Option<RefreshFn>,
    access_expired_codes: HashSet<i64>,
    refresh_expired_codes: HashSet<i64>,
    on_refresh_expired: Option<Arc<dyn Fn() + Send + Sync>>,
    name: String,
    event_listeners: EventListeners<RefreshEvent>,
}

impl RefreshConfigBuilder {
    pub fn new() -> Self {
        Self {
            refresh_access_token: None,
            access_expired_codes: HashSet::new(),
            refresh_expired_codes: HashSet::new(),
            on_refresh_expired: None,
            name: "refresh".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the function used to obtain a fresh access token.
    pub fn refresh_access_token<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        self.refresh_access_token = Some(Arc::new(move || Box::pin(f())));
        self
    }

    /// Sets the set of business codes that mean "access token expired".
    pub fn access_token_expired_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.access_expired_codes = codes.into_iter().collect();
        self
    }

    /// Sets the set of business codes that mean "refresh token expired" (terminal).
    pub fn refresh_token_expired_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.refresh_expired_codes = codes.into_iter().collect();
        self
    }

    /// Sets the side-effect run exactly once when a refresh is terminally expired.
    pub fn on_refresh_token_expired<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_refresh_expired = Some(Arc::new(f));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(self) -> crate::refresh::RefreshController {
        RefreshController::new(RefreshConfig {
            refresh_access_token: self.refresh_access_token,
            access_expired_codes: self.access_expired_codes,
            refresh_expired_codes: self.refresh_expired_codes,
            on_refresh_expired: self.on_refresh_expired,
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }
}

impl Default for RefreshConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the optional in-flight refresh ticket. At most one refresh runs at
/// a time; concurrent observers of access-expiry attach to the same
/// outcome instead of each starting their own.
pub struct RefreshController {
    config: Arc<RefreshConfig>,
    ticket: Arc<Mutex<Option<broadcast::Sender<Result<String, String>>>>>,
}

impl Clone for RefreshController {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            ticket: Arc::clone(&self.ticket),
        }
    }
}

impl RefreshController {
    pub(crate) fn new(config: RefreshConfig) -> Self {
        Self {
            config: Arc::new(config),
            ticket: Arc::new(Mutex::new(None)),
        }
    }

    pub fn builder() -> RefreshConfigBuilder {
        RefreshConfigBuilder::new()
    }

    /// Observes a response's business code and decides what the pipeline
    /// should do next.
    pub async fn observe(&self, code: i64, refresh_attempted: bool) -> RefreshOutcome {
        if self.config.refresh_expired_codes.contains(&code) {
            if let Some(cb) = &self.config.on_refresh_expired {
                cb();
            }
            self.emit(RefreshEvent::Expired {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
            });
            return RefreshOutcome::RefreshExpired;
        }

        if !self.config.access_expired_codes.contains(&code) {
            return RefreshOutcome::NotApplicable;
        }

        if refresh_attempted {
            return RefreshOutcome::AlreadyRetriedAfterRefresh;
        }

        let mut guard = self.ticket.lock().unwrap();
        if let Some(sender) = guard.as_ref() {
            let mut rx = sender.subscribe();
            drop(guard);
            self.emit(RefreshEvent::Joined {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
            });
            return match rx.recv().await {
                Ok(Ok(token)) => RefreshOutcome::NewToken(token),
                Ok(Err(message)) => RefreshOutcome::ConfigurationError(message),
                Err(_closed) => RefreshOutcome::ConfigurationError(
                    "refresh ticket closed without a result".to_string(),
                ),
            };
        }

        // We're the leader: store the ticket before the refresh begins so
        // concurrent observers attach to this future rather than starting
        // their own.
        let (tx, _rx) = broadcast::channel(1);
        *guard = Some(tx.clone());
        drop(guard);

        self.emit(RefreshEvent::Started {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
        });

        let refresh_fn = match &self.config.refresh_access_token {
            Some(f) => Arc::clone(f),
            None => {
                let message = "no refresh-access-token function configured".to_string();
                *self.ticket.lock().unwrap() = None;
                let _ = tx.send(Err(message.clone()));
                self.emit(RefreshEvent::Settled {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    success: false,
                });
                return RefreshOutcome::ConfigurationError(message);
            }
        };

        let result = refresh_fn().await.and_then(|token| {
            if token.is_empty() {
                Err("refresh-access-token returned an empty token".to_string())
            } else {
                Ok(token)
            }
        });

        // Clear the ticket before returning, whether it resolved or rejected,
        // so the next expiry observed after settlement starts a fresh one.
        *self.ticket.lock().unwrap() = None;
        let _ = tx.send(result.clone());
        self.emit(RefreshEvent::Settled {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            success: result.is_ok(),
        });

        match result {
            Ok(token) => RefreshOutcome::NewToken(token),
            Err(message) => {
                if let Some(cb) = &self.config.on_refresh_expired {
                    cb();
                }
                RefreshOutcome::ConfigurationError(message)
            }
        }
    }

    fn emit(&self, event: RefreshEvent) {
        self.config.event_listeners.emit(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn unrelated_code_is_not_applicable() {
        let controller = RefreshController::builder()
            .access_token_expired_codes([401])
            .refresh_token_expired_codes([4011])
            .build();
        assert!(matches!(
            controller.observe(200, false).await,
            RefreshOutcome::NotApplicable
        ));
    }

    #[tokio::test]
    async fn refresh_expired_code_invokes_side_effect_once_and_is_terminal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let controller = RefreshController::builder()
            .refresh_token_expired_codes([4011])
            .on_refresh_token_expired(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        assert!(matches!(
            controller.observe(4011, false).await,
            RefreshOutcome::RefreshExpired
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn already_refresh_attempted_fails_without_starting_another_ticket() {
        let controller = RefreshController::builder()
            .access_token_expired_codes([401])
            .build();
        assert!(matches!(
            controller.observe(401, true).await,
            RefreshOutcome::AlreadyRetriedAfterRefresh
        ));
    }

    #[tokio::test]
    async fn ten_concurrent_observers_share_one_refresh_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let controller = RefreshController::builder()
            .access_token_expired_codes([401])
            .refresh_access_token(move || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    Ok("T1".to_string())
                }
            })
            .build();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let controller = controller.clone();
            handles.push(tokio::spawn(async move { controller.observe(401, false).await }));
        }

        let mut new_tokens = 0;
        for h in handles {
            if let RefreshOutcome::NewToken(token) = h.await.unwrap() {
                assert_eq!(token, "T1");
                new_tokens += 1;
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(new_tokens, 10);
    }

    #[tokio::test]
    async fn empty_token_is_a_configuration_error() {
        let controller = RefreshController::builder()
            .access_token_expired_codes([401])
            .refresh_access_token(|| async { Ok(String::new()) })
            .build();

        assert!(matches!(
            controller.observe(401, false).await,
            RefreshOutcome::ConfigurationError(_)
        ));
    }

    #[tokio::test]
    async fn ticket_clears_after_settling_so_a_later_expiry_starts_fresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let controller = RefreshController::builder()
            .access_token_expired_codes([401])
            .refresh_access_token(move || {
                let c = Arc::clone(&c);
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(format!("T{n}"))
                }
            })
            .build();

        let first = controller.observe(401, false).await;
        let second = controller.observe(401, false).await;

        assert!(matches!(first, RefreshOutcome::NewToken(ref t) if t == "T1"));
        assert!(matches!(second, RefreshOutcome::NewToken(ref t) if t == "T2"));
    }
}

//! The shared error taxonomy for the orchestration pipeline.
//!
//! Every manager surfaces its failures as one of these variants rather than a
//! duck-typed flag, so pipeline stages switch on variant instead of probing
//! an `is_cancel`-style property. `Cancelled` is its own tagged variant
//! (never confused with a transport failure) because it must bypass retry
//! and the global error callback (see `spec.md` §7).

use std::fmt;
use std::sync::Arc;

/// Why a request was cancelled rather than failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelKind {
    /// Superseded by a later request with the same key while debouncing.
    Debounce,
    /// Rejected because the per-key throttle interval had not elapsed.
    Throttle,
    /// Cancelled explicitly through the `CancelRegistry`.
    Manual,
    /// The owning manager was shut down / cleared while this was pending.
    ManagerCleared,
}

impl fmt::Display for CancelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CancelKind::Debounce => "debounce",
            CancelKind::Throttle => "throttle",
            CancelKind::Manual => "manual",
            CancelKind::ManagerCleared => "manager-cleared",
        };
        f.write_str(s)
    }
}

/// The unified error type returned by the orchestration pipeline.
///
/// `E` is the application/transport error type plugged in by the `Transport`
/// implementation the caller provides.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OrchestrationError<E> {
    /// Intentional abandonment. Never retried, never reported to the global
    /// error callback; surfaced directly to the caller.
    #[error("request cancelled ({kind})")]
    Cancelled {
        /// Which coalescing stage (or explicit caller action) cancelled this request.
        kind: CancelKind,
    },

    /// The transport's `send` returned an error.
    #[error("transport error: {0}")]
    Transport(Arc<E>),

    /// The response's business code matched the configured refresh-expired
    /// set. Terminal: the configured side-effect has already run.
    #[error("refresh token expired")]
    RefreshExpired,

    /// The originating request was already marked `refresh-attempted` when
    /// a second access-expiry was observed.
    #[error("already retried after refresh")]
    AlreadyRetriedAfterRefresh,

    /// A business code was observed and no handler consumed it.
    #[error("business error (code={code})")]
    BusinessCode {
        /// The response's business code.
        code: i64,
    },

    /// Missing or invalid wiring: no `refresh-access-token` function
    /// configured, or it returned an empty token.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl<E> OrchestrationError<E> {
    /// Returns `true` for any `Cancelled` variant, regardless of kind.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrchestrationError::Cancelled { .. })
    }

    /// Convenience constructor for a transport failure.
    pub fn transport(err: E) -> Self {
        OrchestrationError::Transport(Arc::new(err))
    }
}

//! Events emitted by the [`crate::CancelRegistry`].

use conduit_core::PipelineEvent;
use std::time::Instant;

/// Observability events for named-cancellation bookkeeping.
#[derive(Debug, Clone)]
pub enum CancelEvent {
    /// A handle was registered under `id`, replacing any prior handle with
    /// the same id.
    Registered {
        pattern_name: String,
        timestamp: Instant,
        id: String,
    },
    /// `cancel-by-id` or `cancel-all` invoked a handle's cancel function.
    Cancelled {
        pattern_name: String,
        timestamp: Instant,
        id: String,
    },
    /// A handle was removed without being cancelled (request completion).
    Removed {
        pattern_name: String,
        timestamp: Instant,
        id: String,
    },
}

impl PipelineEvent for CancelEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CancelEvent::Registered { .. } => "registered",
            CancelEvent::Cancelled { .. } => "cancelled",
            CancelEvent::Removed { .. } => "removed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CancelEvent::Registered { timestamp, .. }
            | CancelEvent::Cancelled { timestamp, .. }
            | CancelEvent::Removed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CancelEvent::Registered { pattern_name, .. }
            | CancelEvent::Cancelled { pattern_name, .. }
            | CancelEvent::Removed { pattern_name, .. } => pattern_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_match_variant() {
        let now = Instant::now();
        assert_eq!(
            CancelEvent::Registered {
                pattern_name: "t".into(),
                timestamp: now,
                id: "a".into(),
            }
            .event_type(),
            "registered"
        );
        assert_eq!(
            CancelEvent::Cancelled {
                pattern_name: "t".into(),
                timestamp: now,
                id: "a".into(),
            }
            .event_type(),
            "cancelled"
        );
    }
}

//! Events emitted by the [`crate::Coalescer`].

use conduit_core::PipelineEvent;
use std::time::Instant;

/// Observability events for debounce and throttle decisions.
#[derive(Debug, Clone)]
pub enum CoalesceEvent {
    /// A debounced call reached quiescence and fired.
    DebounceFired {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    /// A pending debounce was superseded by a later call on the same key.
    DebounceSuperseded {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    /// A throttled call was admitted (the interval had elapsed).
    ThrottleAdmitted {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    /// A throttled call was rejected (inside the interval).
    ThrottleRejected {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
}

impl PipelineEvent for CoalesceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CoalesceEvent::DebounceFired { .. } => "debounce_fired",
            CoalesceEvent::DebounceSuperseded { .. } => "debounce_superseded",
            CoalesceEvent::ThrottleAdmitted { .. } => "throttle_admitted",
            CoalesceEvent::ThrottleRejected { .. } => "throttle_rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CoalesceEvent::DebounceFired { timestamp, .. }
            | CoalesceEvent::DebounceSuperseded { timestamp, .. }
            | CoalesceEvent::ThrottleAdmitted { timestamp, .. }
            | CoalesceEvent::ThrottleRejected { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CoalesceEvent::DebounceFired { pattern_name, .. }
            | CoalesceEvent::DebounceSuperseded { pattern_name, .. }
            | CoalesceEvent::ThrottleAdmitted { pattern_name, .. }
            | CoalesceEvent::ThrottleRejected { pattern_name, .. } => pattern_name,
        }
    }
}

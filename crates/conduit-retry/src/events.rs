//! Events emitted by the [`crate::RetryPolicy`].

use conduit_core::PipelineEvent;
use std::time::{Duration, Instant};

/// Observability events for retried submissions.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A retry attempt is about to be scheduled after `delay`.
    Scheduled {
        pattern_name: String,
        timestamp: Instant,
        attempt: usize,
        delay: Duration,
    },
    /// The operation succeeded, possibly after retries.
    Success {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// All `max_attempts` were exhausted; the last error is surfaced to the caller.
    Exhausted {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// A cancellation was observed while a retry was scheduled or pending.
    CancelledDuringRetry {
        pattern_name: String,
        timestamp: Instant,
        attempt: usize,
    },
}

impl PipelineEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Scheduled { .. } => "scheduled",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::CancelledDuringRetry { .. } => "cancelled_during_retry",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Scheduled { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::CancelledDuringRetry { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RetryEvent::Scheduled { pattern_name, .. }
            | RetryEvent::Success { pattern_name, .. }
            | RetryEvent::Exhausted { pattern_name, .. }
            | RetryEvent::CancelledDuringRetry { pattern_name, .. } => pattern_name,
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
            RetryEvent::Scheduled {
                pattern_name: "t".into(),
                timestamp: now,
                attempt: 1,
                delay: Duration::from_millis(10),
            }
            .event_type(),
            "scheduled"
        );
        assert_eq!(
            RetryEvent::Exhausted {
                pattern_name: "t".into(),
                timestamp: now,
                attempts: 3,
            }
            .event_type(),
            "exhausted"
        );
    }
}

//! Events emitted by the `ConcurrencyController`.

use conduit_core::PipelineEvent;
use std::time::{Duration, Instant};

/// Observability events for admission through the concurrency gate.
#[derive(Debug, Clone)]
pub enum ConcurrencyEvent {
    /// A task was admitted and started running immediately.
    Admitted {
        /// Name of the controller instance.
        pattern_name: String,
        timestamp: Instant,
        /// Number of tasks active after this admission.
        active_calls: usize,
    },
    /// A task could not be admitted within `max_wait_duration` and was rejected.
    Rejected {
        pattern_name: String,
        timestamp: Instant,
        /// The configured bound that was at capacity.
        limit: usize,
    },
    /// A task was queued behind others because the controller was at capacity.
    Queued {
        pattern_name: String,
        timestamp: Instant,
        /// Number of tasks ahead of this one in the FIFO queue.
        queue_depth: usize,
    },
    /// An admitted task completed, successfully or not, releasing its slot.
    Settled {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
        failed: bool,
    },
}

impl PipelineEvent for ConcurrencyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ConcurrencyEvent::Admitted { .. } => "admitted",
            ConcurrencyEvent::Rejected { .. } => "rejected",
            ConcurrencyEvent::Queued { .. } => "queued",
            ConcurrencyEvent::Settled { .. } => "settled",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ConcurrencyEvent::Admitted { timestamp, .. }
            | ConcurrencyEvent::Rejected { timestamp, .. }
            | ConcurrencyEvent::Queued { timestamp, .. }
            | ConcurrencyEvent::Settled { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            ConcurrencyEvent::Admitted { pattern_name, .. }
            | ConcurrencyEvent::Rejected { pattern_name, .. }
            | ConcurrencyEvent::Queued { pattern_name, .. }
            | ConcurrencyEvent::Settled { pattern_name, .. } => pattern_name,
        }
    }
}

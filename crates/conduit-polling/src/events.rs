//! Events emitted by the [`crate::PollingScheduler`].

use conduit_core::PipelineEvent;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum PollingEvent {
    Started {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    Invoked {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        attempt: usize,
    },
    Stopped {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    Exhausted {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        attempts: usize,
    },
}

impl PipelineEvent for PollingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PollingEvent::Started { .. } => "started",
            PollingEvent::Invoked { .. } => "invoked",
            PollingEvent::Stopped { .. } => "stopped",
            PollingEvent::Exhausted { .. } => "exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            PollingEvent::Started { timestamp, .. }
            | PollingEvent::Invoked { timestamp, .. }
            | PollingEvent::Stopped { timestamp, .. }
            | PollingEvent::Exhausted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            PollingEvent::Started { pattern_name, .. }
            | PollingEvent::Invoked { pattern_name, .. }
            | PollingEvent::Stopped { pattern_name, .. }
            | PollingEvent::Exhausted { pattern_name, .. } => pattern_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_match_variant() {
        let event = PollingEvent::Started {
            pattern_name: "poll".to_string(),
            timestamp: Instant::now(),
            key: "job-1".to_string(),
        };
        assert_eq!(event.event_type(), "started");
        assert_eq!(event.pattern_name(), "poll");
    }
}

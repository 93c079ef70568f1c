//! Events emitted by the [`crate::pipeline::MiddlewarePipeline`] and the
//! [`crate::refresh::RefreshController`].

use conduit_core::PipelineEvent;
use std::time::Instant;

/// Observability events for the dual-token refresh flight controller.
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    /// A new refresh ticket was started; this request is the leader.
    Started {
        pattern_name: String,
        timestamp: Instant,
    },
    /// A request observed access-expiry while a refresh ticket was already
    /// in flight and attached to it instead of starting a new one.
    Joined {
        pattern_name: String,
        timestamp: Instant,
    },
    /// The in-flight ticket settled, successfully or not; cleared immediately after.
    Settled {
        pattern_name: String,
        timestamp: Instant,
        success: bool,
    },
    /// A refresh-expired code was observed; terminal.
    Expired {
        pattern_name: String,
        timestamp: Instant,
    },
}

impl PipelineEvent for RefreshEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RefreshEvent::Started { .. } => "started",
            RefreshEvent::Joined { .. } => "joined",
            RefreshEvent::Settled { .. } => "settled",
            RefreshEvent::Expired { .. } => "expired",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RefreshEvent::Started { timestamp, .. }
            | RefreshEvent::Joined { timestamp, .. }
            | RefreshEvent::Settled { timestamp, .. }
            | RefreshEvent::Expired { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RefreshEvent::Started { pattern_name, .. }
            | RefreshEvent::Joined { pattern_name, .. }
            | RefreshEvent::Settled { pattern_name, .. }
            | RefreshEvent::Expired { pattern_name, .. } => pattern_name,
        }
    }
}

/// Observability events for pipeline stage transitions.
#[derive(Debug, Clone)]
pub enum PipelineStageEvent {
    CacheHit {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    CacheMiss {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    CodeHandlerSuppressed {
        pattern_name: String,
        timestamp: Instant,
        code: i64,
    },
}

impl PipelineEvent for PipelineStageEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PipelineStageEvent::CacheHit { .. } => "cache_hit",
            PipelineStageEvent::CacheMiss { .. } => "cache_miss",
            PipelineStageEvent::CodeHandlerSuppressed { .. } => "code_handler_suppressed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            PipelineStageEvent::CacheHit { timestamp, .. }
            | PipelineStageEvent::CacheMiss { timestamp, .. }
            | PipelineStageEvent::CodeHandlerSuppressed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            PipelineStageEvent::CacheHit { pattern_name, .. }
            | PipelineStageEvent::CacheMiss { pattern_name, .. }
            | PipelineStageEvent::CodeHandlerSuppressed { pattern_name, .. } => pattern_name,
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
            RefreshEvent::Started { pattern_name: "t".into(), timestamp: now }.event_type(),
            "started"
        );
        assert_eq!(
            PipelineStageEvent::CacheHit { pattern_name: "t".into(), timestamp: now, key: "k".into() }
                .event_type(),
            "cache_hit"
        );
    }
}

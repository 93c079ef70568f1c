//! Events emitted by the [`crate::Cache`].

use conduit_core::PipelineEvent;
use std::time::Instant;

/// Observability events for cache lookups and writes.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// `get` found a live (non-expired) entry.
    Hit {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    /// `get` found nothing, or found an expired entry.
    Miss {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    /// `set` stored a new entry.
    Write {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    /// A capacity-bounded store evicted its oldest entry to make room.
    Eviction {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
}

impl PipelineEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Write { .. } => "write",
            CacheEvent::Eviction { .. } => "eviction",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Write { timestamp, .. }
            | CacheEvent::Eviction { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CacheEvent::Hit { pattern_name, .. }
            | CacheEvent::Miss { pattern_name, .. }
            | CacheEvent::Write { pattern_name, .. }
            | CacheEvent::Eviction { pattern_name, .. } => pattern_name,
        }
    }
}

//! Events emitted by the [`crate::coordinator::UploadCoordinator`].

use conduit_core::PipelineEvent;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum UploadEvent {
    FingerprintComputed {
        pattern_name: String,
        timestamp: Instant,
        fingerprint: String,
    },
    ChunkStarted {
        pattern_name: String,
        timestamp: Instant,
        chunk_index: usize,
    },
    ChunkCompleted {
        pattern_name: String,
        timestamp: Instant,
        chunk_index: usize,
    },
    ChunkRetried {
        pattern_name: String,
        timestamp: Instant,
        chunk_index: usize,
        attempt: usize,
    },
    Failed {
        pattern_name: String,
        timestamp: Instant,
        chunk_index: usize,
    },
}

impl PipelineEvent for UploadEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UploadEvent::FingerprintComputed { .. } => "fingerprint_computed",
            UploadEvent::ChunkStarted { .. } => "chunk_started",
            UploadEvent::ChunkCompleted { .. } => "chunk_completed",
            UploadEvent::ChunkRetried { .. } => "chunk_retried",
            UploadEvent::Failed { .. } => "failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            UploadEvent::FingerprintComputed { timestamp, .. }
            | UploadEvent::ChunkStarted { timestamp, .. }
            | UploadEvent::ChunkCompleted { timestamp, .. }
            | UploadEvent::ChunkRetried { timestamp, .. }
            | UploadEvent::Failed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            UploadEvent::FingerprintComputed { pattern_name, .. }
            | UploadEvent::ChunkStarted { pattern_name, .. }
            | UploadEvent::ChunkCompleted { pattern_name, .. }
            | UploadEvent::ChunkRetried { pattern_name, .. }
            | UploadEvent::Failed { pattern_name, .. } => pattern_name,
        }
    }
}

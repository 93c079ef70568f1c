//! Error type for the upload coordinator.

use conduit_core::CancelKind;
use std::sync::Arc;

/// Errors that can occur while fingerprinting, planning, or transferring an upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError<E> {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("resume query failed: {0}")]
    ResumeQuery(E),

    #[error("chunk {chunk_index} failed after {attempts} attempt(s): {source}")]
    ChunkFailed {
        chunk_index: usize,
        attempts: usize,
        source: Arc<E>,
    },

    #[error("upload cancelled ({kind:?})")]
    Cancelled { kind: CancelKind },
}

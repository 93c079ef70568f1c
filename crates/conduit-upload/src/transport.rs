//! The wire-level collaborator the coordinator consumes (spec §6's
//! "Chunked upload wire format").

use bytes::Bytes;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-chunk byte-progress callback: `(bytes transferred, chunk size)`.
pub type ChunkProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

pub type UploadFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// One `multipart/form-data` chunk submission: `file`, `chunkIndex`,
/// `totalChunks`, `fileMd5` (fingerprint, despite the field name — the
/// digest algorithm isn't fixed by the wire format) and an optional
/// `chunkMd5`.
pub struct ChunkSubmission {
    pub url: String,
    pub file_fingerprint: String,
    pub chunk_fingerprint: Option<String>,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub data: Bytes,
}

/// The upload-side transport contract: submit a chunk, and optionally
/// discover which chunks the server has already acknowledged for a given
/// file fingerprint.
pub trait ChunkTransport: Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;

    fn upload_chunk(
        &self,
        submission: ChunkSubmission,
        cancel: CancellationToken,
        on_progress: Option<ChunkProgressCallback>,
    ) -> UploadFuture<'_, (), Self::Error>;

    /// `GET <resume_query_url>?fileMd5=<hex>` → the set of chunk indices
    /// already acknowledged by the server for this fingerprint.
    fn resume_query(
        &self,
        resume_query_url: &str,
        file_fingerprint: &str,
    ) -> UploadFuture<'_, HashSet<usize>, Self::Error>;
}

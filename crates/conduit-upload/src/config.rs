//! Configuration for the upload coordinator.

use crate::events::UploadEvent;
use crate::transport::ChunkProgressCallback;
use conduit_concurrency::ConcurrencyController;
use conduit_core::{EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

/// Overall-progress callback: `(chunks completed, total chunks)`.
pub type OverallProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Configuration for a [`crate::UploadCoordinator`].
pub struct UploadConfig {
    pub(crate) chunk_size: usize,
    pub(crate) retry_times: usize,
    pub(crate) retry_delay: Duration,
    pub(crate) enable_resume: bool,
    pub(crate) compute_chunk_hash: bool,
    pub(crate) resume_query_url: Option<String>,
    pub(crate) on_chunk_progress: Option<ChunkProgressCallback>,
    pub(crate) on_overall_progress: Option<OverallProgressCallback>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<UploadEvent>,
}

/// Builder for [`UploadConfig`].
pub struct UploadConfigBuilder {
    chunk_size: usize,
    retry_times: usize,
    retry_delay: Duration,
    enable_resume: bool,
    compute_chunk_hash: bool,
    resume_query_url: Option<String>,
    on_chunk_progress: Option<ChunkProgressCallback>,
    on_overall_progress: Option<OverallProgressCallback>,
    name: String,
    event_listeners: EventListeners<UploadEvent>,
}

const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

impl UploadConfigBuilder {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry_times: 3,
            retry_delay: Duration::from_millis(500),
            enable_resume: true,
            compute_chunk_hash: false,
            resume_query_url: None,
            on_chunk_progress: None,
            on_overall_progress: None,
            name: "upload".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the chunk size in bytes.
    ///
    /// Default: 5 MiB
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sets how many attempts (first try plus retries) each chunk gets.
    ///
    /// Default: 3
    pub fn retry_times(mut self, retry_times: usize) -> Self {
        self.retry_times = retry_times.max(1);
        self
    }

    /// Sets the fixed delay awaited between chunk retry attempts.
    ///
    /// Default: 500ms
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Enables or disables querying the server for already-acknowledged
    /// chunks before transferring.
    ///
    /// Default: true
    pub fn enable_resume(mut self, enable_resume: bool) -> Self {
        self.enable_resume = enable_resume;
        self
    }

    /// Enables or disables computing a per-chunk content digest in addition
    /// to the whole-file fingerprint.
    ///
    /// Default: false
    pub fn compute_chunk_hash(mut self, compute_chunk_hash: bool) -> Self {
        self.compute_chunk_hash = compute_chunk_hash;
        self
    }

    /// Sets the resume-query endpoint base URL.
    pub fn resume_query_url(mut self, resume_query_url: impl Into<String>) -> Self {
        self.resume_query_url = Some(resume_query_url.into());
        self
    }

    /// Registers a per-chunk byte-progress callback.
    ///
    /// # Callback Signature
    /// `Fn(u64, u64)` - bytes transferred, chunk size.
    pub fn on_chunk_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        self.on_chunk_progress = Some(Arc::new(f));
        self
    }

    /// Registers an overall-progress callback, invoked once a chunk's
    /// completion has been acknowledged by the server.
    ///
    /// # Callback Signature
    /// `Fn(usize, usize)` - chunks completed, total chunks.
    pub fn on_overall_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.on_overall_progress = Some(Arc::new(f));
        self
    }

    /// Sets the name of this upload coordinator instance for observability.
    ///
    /// Default: "upload"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a chunk retry is scheduled.
    ///
    /// # Callback Signature
    /// `Fn(usize, usize)` - the chunk index, the attempt number about to run.
    pub fn on_chunk_retried<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let UploadEvent::ChunkRetried {
                chunk_index,
                attempt,
                ..
            } = event
            {
                f(*chunk_index, *attempt);
            }
        }));
        self
    }

    /// Builds the upload coordinator. `concurrency` is the same
    /// [`ConcurrencyController`] the rest of the facade admits requests
    /// through, so a single file upload's chunks compete for admission
    /// slots alongside everything else rather than running under a
    /// private, unbounded controller of their own.
    pub fn build<T>(self, transport: T, concurrency: ConcurrencyController) -> crate::UploadCoordinator<T> {
        crate::UploadCoordinator::new(
            UploadConfig {
                chunk_size: self.chunk_size,
                retry_times: self.retry_times,
                retry_delay: self.retry_delay,
                enable_resume: self.enable_resume,
                compute_chunk_hash: self.compute_chunk_hash,
                resume_query_url: self.resume_query_url,
                on_chunk_progress: self.on_chunk_progress,
                on_overall_progress: self.on_overall_progress,
                name: self.name,
                event_listeners: self.event_listeners,
            },
            transport,
            concurrency,
        )
    }
}

impl Default for UploadConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Chunk planning, resume discovery, and per-chunk transfer (spec §4.9).
//!
//! Pending chunks upload in parallel, each attempt re-submitted through the
//! same [`ConcurrencyController`] the facade's request pipeline admits
//! through, so a single file upload competes for slots rather than running
//! under a private unbounded controller of its own - a stalled or bursty
//! upload cannot monopolise every admission slot, and the controller's own
//! limit is what bounds how many chunks are actually in flight at once. The
//! per-chunk retry reuses [`conduit_retry::RetryPolicy`] directly rather
//! than reimplementing a backoff loop. `futures::future::try_join_all`
//! drives the chunk futures concurrently and drops whichever are still
//! in flight as soon as one fails or is cancelled, so a single `cancel`
//! aborts every outstanding chunk request for this upload.

use crate::config::UploadConfig;
use crate::error::UploadError;
use crate::events::UploadEvent;
use crate::fingerprint::fingerprint_file;
use crate::transport::{ChunkSubmission, ChunkTransport};
use conduit_concurrency::ConcurrencyController;
use conduit_core::{CancelKind, OrchestrationError};
use conduit_retry::RetryPolicy;
use futures::future::try_join_all;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

/// The result of a completed (or resumed-to-completion) upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub file_fingerprint: String,
    pub total_chunks: usize,
}

/// Coordinates a single file's chunked, resumable transfer.
pub struct UploadCoordinator<T: ChunkTransport> {
    transport: Arc<T>,
    config: Arc<UploadConfig>,
    concurrency: ConcurrencyController,
    retry: RetryPolicy,
}

impl<T: ChunkTransport> Clone for UploadCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
            concurrency: self.concurrency.clone(),
            retry: self.retry.clone(),
        }
    }
}

impl<T: ChunkTransport> UploadCoordinator<T> {
    pub(crate) fn new(config: UploadConfig, transport: T, concurrency: ConcurrencyController) -> Self {
        let retry = RetryPolicy::builder()
            .max_attempts(config.retry_times)
            .delay(config.retry_delay)
            .name(format!("{}-chunk-retry", config.name))
            .build();
        Self {
            transport: Arc::new(transport),
            config: Arc::new(config),
            concurrency,
            retry,
        }
    }

    /// Creates a new configuration builder.
    pub fn builder() -> crate::config::UploadConfigBuilder {
        crate::config::UploadConfigBuilder::new()
    }

    /// Fingerprints, plans, and transfers `path` to `url`, skipping any
    /// chunks the server already acknowledges when resume is enabled.
    ///
    /// `cancel` is shared across every chunk of this upload: firing it
    /// aborts the next chunk boundary and leaves already-acknowledged
    /// chunks in place, so a later call with the same fingerprint resumes
    /// from where this one stopped.
    pub async fn upload(
        &self,
        path: impl AsRef<Path>,
        url: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<UploadOutcome, UploadError<T::Error>> {
        let path = path.as_ref();
        let url = url.into();

        let file_fingerprint = fingerprint_file(path.to_path_buf(), self.config.chunk_size)
            .await
            .map_err(UploadError::Io)?;
        self.emit(UploadEvent::FingerprintComputed {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            fingerprint: file_fingerprint.clone(),
        });

        let file_size = tokio::fs::metadata(path).await?.len();
        let total_chunks = total_chunks(file_size, self.config.chunk_size as u64);

        let already_uploaded = if self.config.enable_resume {
            self.resume_query(&file_fingerprint).await?
        } else {
            HashSet::new()
        };

        let completed = Arc::new(AtomicUsize::new(already_uploaded.len()));
        self.report_overall(completed.load(Ordering::SeqCst), total_chunks);

        let pending: Vec<usize> = (0..total_chunks)
            .filter(|chunk_index| !already_uploaded.contains(chunk_index))
            .collect();

        let chunk_uploads = pending.into_iter().map(move |chunk_index| {
            let cancel = cancel.clone();
            let completed = Arc::clone(&completed);
            let url = &url;
            let file_fingerprint = &file_fingerprint;
            async move {
                if cancel.is_cancelled() {
                    return Err(UploadError::Cancelled {
                        kind: CancelKind::Manual,
                    });
                }

                self.emit(UploadEvent::ChunkStarted {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    chunk_index,
                });

                self.upload_one_chunk(
                    path,
                    url,
                    file_fingerprint,
                    chunk_index,
                    total_chunks,
                    self.config.chunk_size as u64,
                    file_size,
                    &cancel,
                )
                .await?;

                self.emit(UploadEvent::ChunkCompleted {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    chunk_index,
                });

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                self.report_overall(done, total_chunks);
                Ok(())
            }
        });

        try_join_all(chunk_uploads).await?;

        Ok(UploadOutcome {
            file_fingerprint,
            total_chunks,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn upload_one_chunk(
        &self,
        path: &Path,
        url: &str,
        file_fingerprint: &str,
        chunk_index: usize,
        total_chunks: usize,
        chunk_size: u64,
        file_size: u64,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError<T::Error>> {
        let data = read_chunk(path, chunk_index, chunk_size, file_size).await?;
        let chunk_fingerprint = self.config.compute_chunk_hash.then(|| {
            let mut hasher = Sha256::new();
            hasher.update(&data);
            hex::encode(hasher.finalize())
        });

        let on_progress = self.config.on_chunk_progress.clone();
        let transport = Arc::clone(&self.transport);
        let url = url.to_string();
        let file_fingerprint = file_fingerprint.to_string();

        let result = self
            .retry
            .run(&self.concurrency, cancel, move |attempt| {
                if attempt > 1 {
                    self.emit(UploadEvent::ChunkRetried {
                        pattern_name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        chunk_index,
                        attempt,
                    });
                }
                let transport = Arc::clone(&transport);
                let submission = ChunkSubmission {
                    url: url.clone(),
                    file_fingerprint: file_fingerprint.clone(),
                    chunk_fingerprint: chunk_fingerprint.clone(),
                    chunk_index,
                    total_chunks,
                    data: data.clone(),
                };
                let cancel = cancel.clone();
                let on_progress = on_progress.clone();
                async move {
                    transport
                        .upload_chunk(submission, cancel, on_progress)
                        .await
                        .map_err(OrchestrationError::transport)
                }
            })
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(OrchestrationError::Cancelled { kind }) => Err(UploadError::Cancelled { kind }),
            Err(OrchestrationError::Transport(err)) => {
                self.emit(UploadEvent::Failed {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    chunk_index,
                });
                Err(UploadError::ChunkFailed {
                    chunk_index,
                    attempts: self.config.retry_times,
                    source: err,
                })
            }
            Err(_) => unreachable!("chunk retry only ever produces Cancelled or Transport"),
        }
    }

    async fn resume_query(
        &self,
        file_fingerprint: &str,
    ) -> Result<HashSet<usize>, UploadError<T::Error>> {
        let Some(resume_query_url) = &self.config.resume_query_url else {
            return Ok(HashSet::new());
        };
        self.transport
            .resume_query(resume_query_url, file_fingerprint)
            .await
            .map_err(UploadError::ResumeQuery)
    }

    fn report_overall(&self, completed: usize, total_chunks: usize) {
        if let Some(callback) = &self.config.on_overall_progress {
            callback(completed, total_chunks);
        }
    }

    fn emit(&self, event: UploadEvent) {
        self.config.event_listeners.emit(&event);
    }
}

fn total_chunks(file_size: u64, chunk_size: u64) -> usize {
    if file_size == 0 {
        return 1;
    }
    file_size.div_ceil(chunk_size) as usize
}

async fn read_chunk(
    path: &Path,
    chunk_index: usize,
    chunk_size: u64,
    file_size: u64,
) -> Result<bytes::Bytes, std::io::Error> {
    let offset = chunk_index as u64 * chunk_size;
    let this_chunk_len = chunk_size.min(file_size.saturating_sub(offset)) as usize;

    let mut file = tokio::fs::File::open(path).await?;
    file.seek(std::io::SeekFrom::Start(offset)).await?;

    let mut buffer = vec![0u8; this_chunk_len];
    file.read_exact(&mut buffer).await?;
    Ok(bytes::Bytes::from(buffer))
}

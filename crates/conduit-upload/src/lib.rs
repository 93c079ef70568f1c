//! Chunked, resumable, content-addressed file upload (spec §4.9, §6).
//!
//! A file is fingerprinted off-thread, split into fixed-size chunks, and
//! transferred sequentially through a caller-supplied [`ChunkTransport`].
//! When resume is enabled the coordinator first asks the server which
//! chunks it already has for this fingerprint and skips them, so a
//! cancelled or interrupted upload can be retried without resending
//! acknowledged data. Every chunk is individually retried with a fixed
//! delay through a [`conduit_concurrency::ConcurrencyController`], matching
//! the rest of the orchestration pipeline's retry semantics rather than the
//! exponential backoff some chunked-upload implementations use.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod transport;

pub use config::{OverallProgressCallback, UploadConfig, UploadConfigBuilder};
pub use coordinator::{UploadCoordinator, UploadOutcome};
pub use error::UploadError;
pub use events::UploadEvent;
pub use fingerprint::fingerprint_file;
pub use transport::{ChunkProgressCallback, ChunkSubmission, ChunkTransport, UploadFuture};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, Clone)]
    struct TestError(String);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[derive(Default)]
    struct MockTransport {
        received: Mutex<Vec<(usize, usize, usize)>>,
        fail_until_attempt: Mutex<HashMap<usize, usize>>,
        attempts: Mutex<HashMap<usize, usize>>,
        acknowledged: Mutex<std::collections::HashSet<usize>>,
    }

    impl MockTransport {
        fn failing(self: &Arc<Self>, chunk_index: usize, succeeds_on_attempt: usize) {
            self.fail_until_attempt
                .lock()
                .unwrap()
                .insert(chunk_index, succeeds_on_attempt);
        }

        fn pre_acknowledge(self: &Arc<Self>, indices: &[usize]) {
            self.acknowledged.lock().unwrap().extend(indices.iter().copied());
        }
    }

    impl ChunkTransport for Arc<MockTransport> {
        type Error = TestError;

        fn upload_chunk(
            &self,
            submission: ChunkSubmission,
            _cancel: CancellationToken,
            _on_progress: Option<ChunkProgressCallback>,
        ) -> UploadFuture<'_, (), Self::Error> {
            let mut attempts = self.attempts.lock().unwrap();
            let attempt = attempts.entry(submission.chunk_index).or_insert(0);
            *attempt += 1;
            let this_attempt = *attempt;
            drop(attempts);

            self.received.lock().unwrap().push((
                submission.chunk_index,
                submission.total_chunks,
                submission.data.len(),
            ));

            let succeeds_on = self
                .fail_until_attempt
                .lock()
                .unwrap()
                .get(&submission.chunk_index)
                .copied()
                .unwrap_or(1);

            Box::pin(async move {
                if this_attempt < succeeds_on {
                    Err(TestError("transient".to_string()))
                } else {
                    Ok(())
                }
            })
        }

        fn resume_query(
            &self,
            _resume_query_url: &str,
            _file_fingerprint: &str,
        ) -> UploadFuture<'_, std::collections::HashSet<usize>, Self::Error> {
            let acknowledged = self.acknowledged.lock().unwrap().clone();
            Box::pin(async move { Ok(acknowledged) })
        }
    }

    fn write_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[tokio::test]
    async fn uploads_every_chunk_exactly_once() {
        let file = write_file(&vec![7u8; 25]);
        let transport = Arc::new(MockTransport::default());
        let coordinator = UploadCoordinator::builder()
            .chunk_size(10)
            .enable_resume(false)
            .build(Arc::clone(&transport));

        let outcome = coordinator
            .upload(file.path(), "https://example.test/upload", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.total_chunks, 3);
        assert_eq!(transport.received.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn resume_skips_already_acknowledged_chunks() {
        let file = write_file(&vec![3u8; 30]);
        let transport = Arc::new(MockTransport::default());
        transport.pre_acknowledge(&[0, 1]);
        let coordinator = UploadCoordinator::builder()
            .chunk_size(10)
            .resume_query_url("https://example.test/resume")
            .build(Arc::clone(&transport));

        let outcome = coordinator
            .upload(file.path(), "https://example.test/upload", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.total_chunks, 3);
        let received = transport.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, 2);
    }

    #[tokio::test]
    async fn a_flaky_chunk_is_retried_to_success() {
        let file = write_file(&vec![1u8; 10]);
        let transport = Arc::new(MockTransport::default());
        transport.failing(0, 2);

        let retried = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&retried);
        let coordinator = UploadCoordinator::builder()
            .chunk_size(10)
            .enable_resume(false)
            .retry_times(3)
            .retry_delay(std::time::Duration::from_millis(1))
            .on_chunk_retried(move |_chunk, _attempt| {
                r.fetch_add(1, Ordering::SeqCst);
            })
            .build(Arc::clone(&transport));

        let outcome = coordinator
            .upload(file.path(), "https://example.test/upload", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.total_chunks, 1);
        assert_eq!(retried.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausting_retries_surfaces_the_transport_error() {
        let file = write_file(&vec![1u8; 5]);
        let transport = Arc::new(MockTransport::default());
        transport.failing(0, 99);
        let coordinator = UploadCoordinator::builder()
            .chunk_size(10)
            .enable_resume(false)
            .retry_times(2)
            .retry_delay(std::time::Duration::from_millis(1))
            .build(Arc::clone(&transport));

        let result = coordinator
            .upload(file.path(), "https://example.test/upload", CancellationToken::new())
            .await;

        assert!(matches!(result, Err(UploadError::ChunkFailed { chunk_index: 0, .. })));
    }

    #[tokio::test]
    async fn cancelling_before_a_chunk_leaves_it_unsent() {
        let file = write_file(&vec![1u8; 30]);
        let transport = Arc::new(MockTransport::default());
        let coordinator = UploadCoordinator::builder()
            .chunk_size(10)
            .enable_resume(false)
            .build(Arc::clone(&transport));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = coordinator
            .upload(file.path(), "https://example.test/upload", cancel)
            .await;

        assert!(matches!(result, Err(UploadError::Cancelled { .. })));
        assert!(transport.received.lock().unwrap().is_empty());
    }
}

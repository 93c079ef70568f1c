//! Error type for the concurrency controller.

/// Errors that can occur when submitting work through a [`crate::ConcurrencyController`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConcurrencyError {
    /// `max_wait_duration` elapsed before a slot became available.
    #[error("concurrency controller at capacity: limit {limit} reached")]
    AtCapacity {
        /// The configured bound that was exceeded.
        limit: usize,
    },
}

/// Result type for concurrency controller operations.
pub type Result<T> = std::result::Result<T, ConcurrencyError>;

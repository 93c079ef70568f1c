//! The transport contract the pipeline consumes (spec §6).
//!
//! The transport is an external collaborator: this crate only depends on
//! its `send` contract, never on a concrete HTTP client.

use crate::types::{RequestDescriptor, ResponseDescriptor};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A byte-progress callback: `(bytes transferred, total bytes)`.
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

pub type TransportFuture<'a, E> =
    Pin<Box<dyn Future<Output = Result<ResponseDescriptor, E>> + Send + 'a>>;

/// `send(request) -> future<response>`, with a cancel signal and optional
/// streamed upload progress. Implemented by whatever low-level HTTP client
/// the application wires in; this crate never constructs one itself.
pub trait Transport: Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;

    fn send(
        &self,
        request: RequestDescriptor,
        cancel: CancellationToken,
        on_progress: Option<ProgressCallback>,
    ) -> TransportFuture<'_, Self::Error>;
}

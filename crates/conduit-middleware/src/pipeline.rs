//! The fixed request/response pipeline (spec §4.5).
//!
//! `MiddlewarePipeline` is the one seam in this workspace that keeps the
//! teacher's primary composition idiom: it implements
//! `tower_service::Service<PipelineRequest>`. Every other manager in this
//! workspace exposes plain async methods instead (see `DESIGN.md`) because
//! they don't shuttle a request through an inner service; the pipeline is
//! the outermost thing wrapping the transport, which is exactly the shape
//! `tower::Service` composition fits.

use crate::config::{CachedResponse, PipelineConfig, CODE_HANDLER_LOCK_WINDOW};
use crate::events::PipelineStageEvent;
use crate::refresh::RefreshOutcome;
use crate::transport::{ProgressCallback, Transport};
use crate::types::ResponseDescriptor;
use conduit_core::{CancelKind, OrchestrationError};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_service::Service;

pub use crate::types::RequestDescriptor;

/// The request type `MiddlewarePipeline` accepts: a descriptor plus the
/// cancellation token the caller registered it under, established upstream
/// by the `Facade`/`CancelRegistry`/`ConcurrencyController` chain before the
/// pipeline is reached (spec §2's data flow).
pub struct PipelineRequest {
    pub descriptor: RequestDescriptor,
    pub cancel: CancellationToken,
    /// Streamed transfer progress, forwarded to the transport's initial
    /// send only (a refresh re-send does not repeat it). Used by
    /// download/upload-shaped requests; ordinary requests pass `None`.
    pub on_progress: Option<ProgressCallback>,
}

impl PipelineRequest {
    pub fn new(descriptor: RequestDescriptor, cancel: CancellationToken) -> Self {
        Self { descriptor, cancel, on_progress: None }
    }
}

pub struct MiddlewarePipeline<T: Transport> {
    transport: Arc<T>,
    config: Arc<PipelineConfig>,
}

impl<T: Transport> Clone for MiddlewarePipeline<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
        }
    }
}

impl<T: Transport> MiddlewarePipeline<T> {
    pub(crate) fn new(transport: T, config: PipelineConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config: Arc::new(config),
        }
    }

    pub fn builder() -> crate::config::PipelineConfigBuilder {
        crate::config::PipelineConfigBuilder::new()
    }

    async fn process(
        &self,
        mut request: RequestDescriptor,
        cancel: CancellationToken,
        on_progress: Option<ProgressCallback>,
    ) -> Result<ResponseDescriptor, OrchestrationError<T::Error>> {
        // 1. Token injection.
        if let Some(provider) = &self.config.token_provider {
            match provider().await {
                Ok(token) => request.set_bearer_token(&token),
                Err(message) => return Err(OrchestrationError::Configuration(message)),
            }
        }

        let key = request.key();

        // 2. Cache lookup: short-circuit onto the success/response-side path.
        if let Some(cache) = &self.config.cache {
            if let Some(cached) = cache.get(&key) {
                self.emit(PipelineStageEvent::CacheHit {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    key: key.clone(),
                });
                let response = ResponseDescriptor {
                    status: cached.status,
                    status_text: cached.status_text,
                    headers: Default::default(),
                    body: cached.body,
                    request: request.clone(),
                    from_cache: true,
                };
                return self.response_side(response, cancel).await;
            }
            self.emit(PipelineStageEvent::CacheMiss {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                key: key.clone(),
            });
        }

        // 3. Debounce.
        if let (Some(coalescer), Some(delay)) = (&self.config.coalescer, self.config.debounce_interval) {
            if let Err(kind) = coalescer.debounce(key.clone(), delay).await {
                self.on_cancelled(&request, kind);
                return Err(OrchestrationError::Cancelled { kind });
            }
        }

        // 4. Throttle.
        if let (Some(coalescer), Some(interval)) = (&self.config.coalescer, self.config.throttle_interval) {
            if let Err(kind) = coalescer.throttle(key.clone(), interval) {
                self.on_cancelled(&request, kind);
                return Err(OrchestrationError::Cancelled { kind });
            }
        }

        // 5. User request middleware.
        if let Some(middleware) = &self.config.request_middleware {
            middleware(&mut request);
        }

        let response = self
            .transport
            .send(request, cancel.clone(), on_progress)
            .await
            .map_err(OrchestrationError::transport)?;

        self.response_side(response, cancel).await
    }

    fn response_side<'a>(
        &'a self,
        response: ResponseDescriptor,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<ResponseDescriptor, OrchestrationError<T::Error>>> + Send + 'a>>
    {
        Box::pin(async move {
            // 1. Global response handler.
            let mut response = match &self.config.response_handler {
                Some(handler) => handler(response),
                None => response,
            };

            // 2. Code handler with a 1-second re-entrancy lock.
            if let Some(code) = response.business_code() {
                if let Some(handler) = self.config.code_handlers.get(&code) {
                    if self.try_acquire_code_lock(code) {
                        handler(&response);
                    } else {
                        self.emit(PipelineStageEvent::CodeHandlerSuppressed {
                            pattern_name: self.config.name.clone(),
                            timestamp: Instant::now(),
                            code,
                        });
                    }
                }
            }

            // 3. Dual-token expiry detection.
            if let Some(refresh) = &self.config.refresh {
                if let Some(code) = response.business_code() {
                    match refresh.observe(code, response.request.refresh_attempted).await {
                        RefreshOutcome::NotApplicable => {}
                        RefreshOutcome::RefreshExpired => {
                            return Err(OrchestrationError::RefreshExpired);
                        }
                        RefreshOutcome::AlreadyRetriedAfterRefresh => {
                            return Err(OrchestrationError::AlreadyRetriedAfterRefresh);
                        }
                        RefreshOutcome::ConfigurationError(message) => {
                            return Err(OrchestrationError::Configuration(message));
                        }
                        RefreshOutcome::NewToken(token) => {
                            let mut retried_request = response.request.clone();
                            retried_request.refresh_attempted = true;
                            retried_request.set_bearer_token(&token);

                            // Re-send directly through the transport, not the
                            // full pipeline, so this doesn't debounce or
                            // re-check the cache a second time. Reuses the
                            // original request's cancellation token so a
                            // cancel-by-id still aborts this attempt.
                            let retried_response = self
                                .transport
                                .send(retried_request, cancel.clone(), None)
                                .await
                                .map_err(OrchestrationError::transport)?;

                            return self.response_side(retried_response, cancel).await;
                        }
                    }
                }
            }

            // 4. User response middleware.
            if let Some(middleware) = &self.config.response_middleware {
                middleware(&mut response);
            }

            // 5. Cache write.
            if let Some(cache) = &self.config.cache {
                if !response.from_cache {
                    let key = response.request.key();
                    cache.set(
                        key,
                        CachedResponse {
                            status: response.status,
                            status_text: response.status_text.clone(),
                            body: response.body.clone(),
                        },
                        self.config.cache_ttl,
                    );
                }
            }

            Ok(response)
        })
    }

    fn try_acquire_code_lock(&self, code: i64) -> bool {
        let mut lock = self.config.code_lock.lock().unwrap();
        let now = Instant::now();
        match lock.get(&code) {
            Some(last) if now.duration_since(*last) < CODE_HANDLER_LOCK_WINDOW => false,
            _ => {
                lock.insert(code, now);
                true
            }
        }
    }

    fn on_cancelled(&self, request: &RequestDescriptor, kind: CancelKind) {
        if let Some(middleware) = &self.config.request_cancel_middleware {
            middleware(request, kind);
        }
    }

    fn emit(&self, event: PipelineStageEvent) {
        self.config.event_listeners.emit(&event);
    }
}

impl<T: Transport> Service<PipelineRequest> for MiddlewarePipeline<T> {
    type Response = ResponseDescriptor;
    type Error = OrchestrationError<T::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: PipelineRequest) -> Self::Future {
        let pipeline = self.clone();
        Box::pin(async move {
            pipeline
                .process(req.descriptor, req.cancel, req.on_progress)
                .await
        })
    }
}

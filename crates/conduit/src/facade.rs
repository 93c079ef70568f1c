//! Binds the managers together and exposes the request/upload/download/
//! polling/cancel/clear-cache operations (spec §6).

use crate::config::{build_pipeline_config, FacadeConfig};
use conduit_cache::Cache;
use conduit_cancel::CancelRegistry;
use conduit_coalesce::Coalescer;
use conduit_concurrency::ConcurrencyController;
use conduit_core::{CancelKind, OrchestrationError};
use conduit_middleware::{
    Body, CachedResponse, Headers, Method, MiddlewarePipeline, PipelineRequest, ProgressCallback,
    RequestDescriptor, ResponseDescriptor, ResponseType, Transport,
};
use conduit_polling::{PollingConfig, PollingScheduler};
use conduit_upload::{ChunkTransport, UploadCoordinator, UploadError, UploadOutcome};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_service::Service;

/// Per-call overrides recognised by `get`/`post`/`put`/`delete`/`download_file`.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub cancel_token_id: Option<String>,
    pub headers: Option<Headers>,
    pub params: Option<BTreeMap<String, String>>,
    pub response_type: Option<ResponseType>,
}

/// Describes one `start_polling` task: the request it repeats, the
/// schedule, and a name for observability.
pub struct PollingRequestConfig {
    pub method: Method,
    pub url: String,
    pub body: Option<Body>,
    pub request: RequestConfig,
    pub interval: Duration,
    pub max_polling_times: usize,
    pub name: String,
}

impl PollingRequestConfig {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            request: RequestConfig::default(),
            interval: Duration::from_secs(1),
            max_polling_times: usize::MAX,
            name: "conduit-poll".to_string(),
        }
    }
}

fn build_descriptor(
    method: Method,
    url: String,
    body: Option<Body>,
    request_config: &RequestConfig,
) -> RequestDescriptor {
    let mut descriptor = RequestDescriptor::new(method, url);
    descriptor.body = body;
    if let Some(headers) = &request_config.headers {
        descriptor.headers = headers.clone();
    }
    if let Some(params) = &request_config.params {
        descriptor.params = Some(params.clone());
    }
    if let Some(response_type) = request_config.response_type {
        descriptor.response_type = response_type;
    }
    descriptor.cancel_token_id = request_config.cancel_token_id.clone();
    descriptor
}

/// The bound-together orchestration facade (spec §2, §6). `C` is a single
/// client type implementing both the HTTP-request [`Transport`] contract
/// and the chunked-upload [`ChunkTransport`] contract with the same error
/// type — most real HTTP clients (a `reqwest::Client` handle, say) are
/// cheap to clone, which this facade relies on to hand the same underlying
/// client to both the request pipeline and the upload coordinator.
pub struct Facade<C>
where
    C: Transport + ChunkTransport<Error = <C as Transport>::Error>,
{
    pipeline: MiddlewarePipeline<C>,
    cache: Option<Cache<CachedResponse>>,
    concurrency: ConcurrencyController,
    cancel_registry: CancelRegistry,
    upload: UploadCoordinator<C>,
    polling: PollingScheduler<ResponseDescriptor, OrchestrationError<C::Error>>,
    enable_retry: bool,
    retry_times: usize,
    retry_delay: Duration,
    on_error: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    on_download_progress: Option<ProgressCallback>,
}

impl<C> Clone for Facade<C>
where
    C: Transport + ChunkTransport<Error = <C as Transport>::Error>,
{
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            cache: self.cache.clone(),
            concurrency: self.concurrency.clone(),
            cancel_registry: self.cancel_registry.clone(),
            upload: self.upload.clone(),
            polling: self.polling.clone(),
            enable_retry: self.enable_retry,
            retry_times: self.retry_times,
            retry_delay: self.retry_delay,
            on_error: self.on_error.clone(),
            on_download_progress: self.on_download_progress.clone(),
        }
    }
}

impl<C> Facade<C>
where
    C: Transport + ChunkTransport<Error = <C as Transport>::Error> + Clone,
{
    pub(crate) fn new(config: FacadeConfig, transport: C) -> Self {
        let cache = config
            .enable_cache
            .then(|| Cache::builder().name(format!("{}-cache", config.name)).build());
        let coalescer = (config.enable_debounce || config.enable_throttle)
            .then(|| Coalescer::builder().name(format!("{}-coalesce", config.name)).build());

        let pipeline =
            build_pipeline_config(&config, cache.clone(), coalescer).build(transport.clone());

        let concurrency = match config.max_concurrent {
            Some(limit) => ConcurrencyController::builder()
                .limit(limit)
                .name(format!("{}-concurrency", config.name))
                .build(),
            None => ConcurrencyController::builder()
                .unconstrained()
                .name(format!("{}-concurrency", config.name))
                .build(),
        };

        let cancel_registry = CancelRegistry::builder()
            .name(format!("{}-cancel", config.name))
            .build();

        let mut upload_builder = UploadCoordinator::builder()
            .chunk_size(config.chunk_size)
            .retry_times(config.upload_retry_times)
            .retry_delay(config.upload_retry_delay)
            .enable_resume(config.enable_resume)
            .compute_chunk_hash(config.compute_chunk_hash)
            .name(format!("{}-upload", config.name));
        if let Some(url) = &config.resume_query_url {
            upload_builder = upload_builder.resume_query_url(url.clone());
        }
        if let Some(callback) = &config.on_chunk_progress {
            let callback = Arc::clone(callback);
            upload_builder = upload_builder.on_chunk_progress(move |sent, total| callback(sent, total));
        }
        if let Some(callback) = &config.on_overall_progress {
            let callback = Arc::clone(callback);
            upload_builder =
                upload_builder.on_overall_progress(move |completed, total| callback(completed, total));
        }
        let upload = upload_builder.build(transport, concurrency.clone());

        Self {
            pipeline,
            cache,
            concurrency,
            cancel_registry,
            upload,
            polling: PollingScheduler::new(),
            enable_retry: config.enable_retry,
            retry_times: config.retry_times,
            retry_delay: config.retry_delay,
            on_error: config.on_error,
            on_download_progress: config.on_download_progress,
        }
    }

    /// Sends a `GET` request.
    pub async fn get(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<ResponseDescriptor, OrchestrationError<C::Error>> {
        let cancel_token_id = config.cancel_token_id.clone();
        let descriptor = build_descriptor(Method::Get, url.into(), None, &config);
        self.run_request(descriptor, cancel_token_id, None).await
    }

    /// Sends a `POST` request.
    pub async fn post(
        &self,
        url: impl Into<String>,
        body: Option<Body>,
        config: RequestConfig,
    ) -> Result<ResponseDescriptor, OrchestrationError<C::Error>> {
        let cancel_token_id = config.cancel_token_id.clone();
        let descriptor = build_descriptor(Method::Post, url.into(), body, &config);
        self.run_request(descriptor, cancel_token_id, None).await
    }

    /// Sends a `PUT` request.
    pub async fn put(
        &self,
        url: impl Into<String>,
        body: Option<Body>,
        config: RequestConfig,
    ) -> Result<ResponseDescriptor, OrchestrationError<C::Error>> {
        let cancel_token_id = config.cancel_token_id.clone();
        let descriptor = build_descriptor(Method::Put, url.into(), body, &config);
        self.run_request(descriptor, cancel_token_id, None).await
    }

    /// Sends a `DELETE` request.
    pub async fn delete(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<ResponseDescriptor, OrchestrationError<C::Error>> {
        let cancel_token_id = config.cancel_token_id.clone();
        let descriptor = build_descriptor(Method::Delete, url.into(), None, &config);
        self.run_request(descriptor, cancel_token_id, None).await
    }

    /// Requests a binary response and reports byte progress through the
    /// configured `on-download-progress` callback, if any. Triggering a
    /// save action from the returned bytes is left to the caller (spec §1
    /// excludes the download-trigger glue).
    pub async fn download_file(
        &self,
        url: impl Into<String>,
        method: Method,
        mut config: RequestConfig,
    ) -> Result<ResponseDescriptor, OrchestrationError<C::Error>> {
        config.response_type = Some(ResponseType::Binary);
        let cancel_token_id = config.cancel_token_id.clone();
        let descriptor = build_descriptor(method, url.into(), None, &config);
        self.run_request(descriptor, cancel_token_id, self.on_download_progress.clone())
            .await
    }

    /// Uploads `path` to `url` in chunks, optionally registering the shared
    /// cancel handle under `cancel_token_id`.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        url: impl Into<String>,
        cancel_token_id: Option<String>,
    ) -> Result<UploadOutcome, UploadError<C::Error>> {
        let cancel = CancellationToken::new();
        if let Some(id) = &cancel_token_id {
            self.cancel_registry.set(id.clone(), cancel.clone());
        }

        let result = self.upload.upload(path, url, cancel).await;

        if let Some(id) = &cancel_token_id {
            self.cancel_registry.delete(id);
        }
        result
    }

    /// Starts a named periodic task that re-sends the described request,
    /// stopping any existing task already registered under `key` first.
    pub fn start_polling<OnSuccess, OnError>(
        &self,
        key: impl Into<String>,
        poll: PollingRequestConfig,
        on_success: OnSuccess,
        on_error: OnError,
    ) where
        OnSuccess: Fn(ResponseDescriptor) + Send + Sync + 'static,
        OnError: Fn(OrchestrationError<C::Error>) + Send + Sync + 'static,
    {
        let facade = self.clone();
        let method = poll.method;
        let url = poll.url;
        let body = poll.body;
        let request_config = poll.request;

        let task_config = PollingConfig::builder()
            .interval(poll.interval)
            .max_polling_times(poll.max_polling_times)
            .name(poll.name)
            .task(move |_attempt| {
                let facade = facade.clone();
                let descriptor = build_descriptor(method, url.clone(), body.clone(), &request_config);
                let cancel_token_id = request_config.cancel_token_id.clone();
                async move { facade.run_request(descriptor, cancel_token_id, None).await }
            })
            .on_success(on_success)
            .on_error(on_error)
            .build();

        self.polling.start(key, task_config);
    }

    /// Stops the polling task registered under `key`, if any.
    pub fn stop_polling(&self, key: &str) {
        self.polling.stop(key);
    }

    /// Cancels the request registered under `id`. Returns `true` if one was found.
    pub fn cancel_request(&self, id: &str) -> bool {
        self.cancel_registry.cancel_by_id(id)
    }

    /// Cancels every currently registered request. Returns the number cancelled.
    pub fn cancel_all_requests(&self) -> usize {
        self.cancel_registry.cancel_all()
    }

    /// Empties the response cache, if caching is enabled.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    async fn run_request(
        &self,
        descriptor: RequestDescriptor,
        cancel_token_id: Option<String>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<ResponseDescriptor, OrchestrationError<C::Error>> {
        let cancel = CancellationToken::new();
        if let Some(id) = &cancel_token_id {
            self.cancel_registry.set(id.clone(), cancel.clone());
        }

        let result = self.send_with_retry(descriptor, cancel, on_progress).await;

        if let Some(id) = &cancel_token_id {
            self.cancel_registry.delete(id);
        }

        if let Err(err) = &result {
            if !err.is_cancelled() {
                if let Some(on_error) = &self.on_error {
                    on_error(&err.to_string());
                }
            }
        }

        result
    }

    /// Re-submits through [`ConcurrencyController`] on every attempt (the
    /// same shape `conduit_retry::RetryPolicy::run` uses) but, unlike that
    /// generic policy, retries only `Transport` failures — `RefreshExpired`,
    /// `AlreadyRetriedAfterRefresh`, `BusinessCode` and `Configuration` are
    /// terminal per spec §7 and must surface on the first occurrence.
    async fn send_with_retry(
        &self,
        descriptor: RequestDescriptor,
        cancel: CancellationToken,
        on_progress: Option<ProgressCallback>,
    ) -> Result<ResponseDescriptor, OrchestrationError<C::Error>> {
        let mut attempt = 1usize;
        loop {
            let mut attempt_descriptor = descriptor.clone();
            attempt_descriptor.retry_count = attempt - 1;
            let mut pipeline = self.pipeline.clone();
            let request = PipelineRequest {
                descriptor: attempt_descriptor,
                cancel: cancel.clone(),
                on_progress: on_progress.clone(),
            };

            let outcome = self
                .concurrency
                .run(move || async move { Service::call(&mut pipeline, request).await })
                .await
                .map_err(|err| OrchestrationError::Configuration(err.to_string()))?;

            match outcome {
                Ok(response) => return Ok(response),
                Err(err) if err.is_cancelled() => return Err(err),
                Err(OrchestrationError::Transport(inner)) => {
                    if !self.enable_retry || attempt > self.retry_times {
                        return Err(OrchestrationError::Transport(inner));
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(self.retry_delay) => {}
                        _ = cancel.cancelled() => {
                            return Err(OrchestrationError::Cancelled { kind: CancelKind::Manual });
                        }
                    }
                    attempt += 1;
                }
                Err(other) => return Err(other),
            }
        }
    }
}

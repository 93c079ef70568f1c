//! Wrapper configuration for the [`crate::Facade`] (spec §6's "Wrapper
//! configuration" option set, plus upload defaults and the download-progress
//! supplement).

use conduit_cache::Cache;
use conduit_coalesce::Coalescer;
use conduit_core::CancelKind;
use conduit_middleware::{
    CachedResponse, CodeHandler, PipelineConfigBuilder, RefreshConfigBuilder, RequestDescriptor,
    RequestCancelMiddleware, RequestMiddleware, ResponseDescriptor, ResponseHandler,
    ResponseMiddleware,
};
use conduit_upload::{ChunkProgressCallback, OverallProgressCallback};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// `Fn() -> future<Result<token, failure_message>>`, shared by the token
/// provider and the dual-token refresh function.
pub type TokenProvider =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<String, String>> + Send>> + Send + Sync>;

/// The global error callback: fires at most once per request, after retry
/// is exhausted, for non-cancelled errors (spec §7).
pub type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Download byte-progress callback: `(bytes transferred, total bytes)`.
pub type DownloadProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Configuration accepted by [`crate::Facade::build`].
pub struct FacadeConfig {
    pub(crate) max_concurrent: Option<usize>,

    pub(crate) enable_cache: bool,
    pub(crate) cache_ttl: Option<Duration>,

    pub(crate) enable_debounce: bool,
    pub(crate) debounce_interval: Duration,

    pub(crate) enable_throttle: bool,
    pub(crate) throttle_interval: Duration,

    pub(crate) enable_retry: bool,
    pub(crate) retry_times: usize,
    pub(crate) retry_delay: Duration,

    pub(crate) token_provider: Option<TokenProvider>,

    pub(crate) enable_double_token: bool,
    pub(crate) refresh_access_token: Option<TokenProvider>,
    pub(crate) access_token_expired_codes: Vec<i64>,
    pub(crate) refresh_token_expired_codes: Vec<i64>,
    pub(crate) on_refresh_token_expired: Option<Arc<dyn Fn() + Send + Sync>>,

    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) response_handler: Option<ResponseHandler>,
    pub(crate) code_handlers: Vec<(i64, CodeHandler)>,
    pub(crate) request_middleware: Option<RequestMiddleware>,
    pub(crate) request_cancel_middleware: Option<RequestCancelMiddleware>,
    pub(crate) response_middleware: Option<ResponseMiddleware>,

    pub(crate) chunk_size: usize,
    pub(crate) enable_resume: bool,
    pub(crate) compute_chunk_hash: bool,
    pub(crate) resume_query_url: Option<String>,
    pub(crate) upload_retry_times: usize,
    pub(crate) upload_retry_delay: Duration,
    pub(crate) on_chunk_progress: Option<ChunkProgressCallback>,
    pub(crate) on_overall_progress: Option<OverallProgressCallback>,

    pub(crate) on_download_progress: Option<DownloadProgressCallback>,

    pub(crate) name: String,
}

/// Builder for [`FacadeConfig`].
pub struct FacadeConfigBuilder {
    max_concurrent: Option<usize>,
    enable_cache: bool,
    cache_ttl: Option<Duration>,
    enable_debounce: bool,
    debounce_interval: Duration,
    enable_throttle: bool,
    throttle_interval: Duration,
    enable_retry: bool,
    retry_times: usize,
    retry_delay: Duration,
    token_provider: Option<TokenProvider>,
    enable_double_token: bool,
    refresh_access_token: Option<TokenProvider>,
    access_token_expired_codes: Vec<i64>,
    refresh_token_expired_codes: Vec<i64>,
    on_refresh_token_expired: Option<Arc<dyn Fn() + Send + Sync>>,
    on_error: Option<ErrorCallback>,
    response_handler: Option<ResponseHandler>,
    code_handlers: Vec<(i64, CodeHandler)>,
    request_middleware: Option<RequestMiddleware>,
    request_cancel_middleware: Option<RequestCancelMiddleware>,
    response_middleware: Option<ResponseMiddleware>,
    chunk_size: usize,
    enable_resume: bool,
    compute_chunk_hash: bool,
    resume_query_url: Option<String>,
    upload_retry_times: usize,
    upload_retry_delay: Duration,
    on_chunk_progress: Option<ChunkProgressCallback>,
    on_overall_progress: Option<OverallProgressCallback>,
    on_download_progress: Option<DownloadProgressCallback>,
    name: String,
}

impl FacadeConfigBuilder {
    pub fn new() -> Self {
        Self {
            max_concurrent: None,
            enable_cache: false,
            cache_ttl: None,
            enable_debounce: false,
            debounce_interval: Duration::from_millis(300),
            enable_throttle: false,
            throttle_interval: Duration::from_millis(300),
            enable_retry: false,
            retry_times: 3,
            retry_delay: Duration::from_millis(500),
            token_provider: None,
            enable_double_token: false,
            refresh_access_token: None,
            access_token_expired_codes: Vec::new(),
            refresh_token_expired_codes: Vec::new(),
            on_refresh_token_expired: None,
            on_error: None,
            response_handler: None,
            code_handlers: Vec::new(),
            request_middleware: None,
            request_cancel_middleware: None,
            response_middleware: None,
            chunk_size: 5 * 1024 * 1024,
            enable_resume: true,
            compute_chunk_hash: false,
            resume_query_url: None,
            upload_retry_times: 3,
            upload_retry_delay: Duration::from_millis(500),
            on_chunk_progress: None,
            on_overall_progress: None,
            on_download_progress: None,
            name: "conduit".to_string(),
        }
    }

    /// Bounds the number of in-flight requests admitted at once.
    ///
    /// Default: unconstrained
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = Some(max_concurrent);
        self
    }

    /// Enables response caching.
    pub fn enable_cache(mut self, enable: bool) -> Self {
        self.enable_cache = enable;
        self
    }

    /// Sets the default TTL applied to cache writes.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Enables trailing debounce.
    pub fn enable_debounce(mut self, enable: bool) -> Self {
        self.enable_debounce = enable;
        self
    }

    /// Sets the debounce quiescence window.
    ///
    /// Default: 300ms
    pub fn debounce_interval(mut self, interval: Duration) -> Self {
        self.debounce_interval = interval;
        self
    }

    /// Enables leading throttle.
    pub fn enable_throttle(mut self, enable: bool) -> Self {
        self.enable_throttle = enable;
        self
    }

    /// Sets the minimum interval between leading throttle admissions.
    ///
    /// Default: 300ms
    pub fn throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = interval;
        self
    }

    /// Enables retry-on-transport-failure.
    pub fn enable_retry(mut self, enable: bool) -> Self {
        self.enable_retry = enable;
        self
    }

    /// Sets how many retries (beyond the first attempt) a failing request gets.
    ///
    /// Default: 3
    pub fn retry_times(mut self, retry_times: usize) -> Self {
        self.retry_times = retry_times;
        self
    }

    /// Sets the fixed delay awaited between retries.
    ///
    /// Default: 500ms
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Sets the function used to obtain a bearer token injected on every request.
    pub fn token_provider<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        self.token_provider = Some(Arc::new(move || Box::pin(f())));
        self
    }

    /// Enables dual-token (access/refresh) recovery.
    pub fn enable_double_token(mut self, enable: bool) -> Self {
        self.enable_double_token = enable;
        self
    }

    /// Sets the function used to obtain a fresh access token on expiry.
    pub fn refresh_access_token<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        self.refresh_access_token = Some(Arc::new(move || Box::pin(f())));
        self
    }

    /// Sets the business codes meaning "access token expired".
    pub fn access_token_expired_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.access_token_expired_codes = codes.into_iter().collect();
        self
    }

    /// Sets the business codes meaning "refresh token expired" (terminal).
    pub fn refresh_token_expired_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.refresh_token_expired_codes = codes.into_iter().collect();
        self
    }

    /// Registers the side effect run once when a refresh terminally expires.
    pub fn on_refresh_token_expired<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_refresh_token_expired = Some(Arc::new(f));
        self
    }

    /// Registers the global error callback, fired at most once per request
    /// for non-cancelled, retry-exhausted errors.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Sets the global response mapper.
    pub fn response_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(ResponseDescriptor) -> ResponseDescriptor + Send + Sync + 'static,
    {
        self.response_handler = Some(Arc::new(f));
        self
    }

    /// Registers a per-business-code side-effect handler.
    pub fn code_handler<F>(mut self, code: i64, f: F) -> Self
    where
        F: Fn(&ResponseDescriptor) + Send + Sync + 'static,
    {
        self.code_handlers.push((code, Arc::new(f)));
        self
    }

    /// Sets the request-side user interceptor.
    pub fn request_middleware<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut RequestDescriptor) + Send + Sync + 'static,
    {
        self.request_middleware = Some(Arc::new(f));
        self
    }

    /// Sets the hook invoked when the request-side chain cancels a request
    /// (debounce or throttle).
    pub fn request_cancel_middleware<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestDescriptor, CancelKind) + Send + Sync + 'static,
    {
        self.request_cancel_middleware = Some(Arc::new(f));
        self
    }

    /// Sets the response-side user interceptor.
    pub fn response_middleware<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ResponseDescriptor) + Send + Sync + 'static,
    {
        self.response_middleware = Some(Arc::new(f));
        self
    }

    /// Sets the default chunk size used by [`crate::Facade::upload_file`].
    ///
    /// Default: 5 MiB
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Enables resume discovery before an upload starts.
    ///
    /// Default: true
    pub fn enable_resume(mut self, enable: bool) -> Self {
        self.enable_resume = enable;
        self
    }

    /// Enables computing a per-chunk content digest in addition to the
    /// whole-file fingerprint.
    ///
    /// Default: false
    pub fn compute_chunk_hash(mut self, enable: bool) -> Self {
        self.compute_chunk_hash = enable;
        self
    }

    /// Sets the resume-query endpoint base URL.
    pub fn resume_query_url(mut self, url: impl Into<String>) -> Self {
        self.resume_query_url = Some(url.into());
        self
    }

    /// Sets how many attempts (first try plus retries) each chunk gets.
    ///
    /// Default: 3
    pub fn upload_retry_times(mut self, retry_times: usize) -> Self {
        self.upload_retry_times = retry_times;
        self
    }

    /// Sets the fixed delay awaited between chunk retry attempts.
    ///
    /// Default: 500ms
    pub fn upload_retry_delay(mut self, delay: Duration) -> Self {
        self.upload_retry_delay = delay;
        self
    }

    /// Registers a per-chunk byte-progress callback.
    pub fn on_chunk_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        self.on_chunk_progress = Some(Arc::new(f));
        self
    }

    /// Registers an overall upload-progress callback (chunks completed, total chunks).
    pub fn on_overall_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.on_overall_progress = Some(Arc::new(f));
        self
    }

    /// Registers a download byte-progress callback.
    pub fn on_download_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        self.on_download_progress = Some(Arc::new(f));
        self
    }

    /// Sets the name of this facade instance for observability.
    ///
    /// Default: "conduit"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builds the configuration.
    pub fn build_config(self) -> FacadeConfig {
        FacadeConfig {
            max_concurrent: self.max_concurrent,
            enable_cache: self.enable_cache,
            cache_ttl: self.cache_ttl,
            enable_debounce: self.enable_debounce,
            debounce_interval: self.debounce_interval,
            enable_throttle: self.enable_throttle,
            throttle_interval: self.throttle_interval,
            enable_retry: self.enable_retry,
            retry_times: self.retry_times,
            retry_delay: self.retry_delay,
            token_provider: self.token_provider,
            enable_double_token: self.enable_double_token,
            refresh_access_token: self.refresh_access_token,
            access_token_expired_codes: self.access_token_expired_codes,
            refresh_token_expired_codes: self.refresh_token_expired_codes,
            on_refresh_token_expired: self.on_refresh_token_expired,
            on_error: self.on_error,
            response_handler: self.response_handler,
            code_handlers: self.code_handlers,
            request_middleware: self.request_middleware,
            request_cancel_middleware: self.request_cancel_middleware,
            response_middleware: self.response_middleware,
            chunk_size: self.chunk_size,
            enable_resume: self.enable_resume,
            compute_chunk_hash: self.compute_chunk_hash,
            resume_query_url: self.resume_query_url,
            upload_retry_times: self.upload_retry_times,
            upload_retry_delay: self.upload_retry_delay,
            on_chunk_progress: self.on_chunk_progress,
            on_overall_progress: self.on_overall_progress,
            on_download_progress: self.on_download_progress,
            name: self.name,
        }
    }

    /// Builds the configuration and binds it to `transport`, producing a
    /// ready-to-use [`crate::Facade`].
    pub fn build<T>(self, transport: T) -> crate::Facade<T>
    where
        T: conduit_middleware::Transport
            + conduit_upload::ChunkTransport<Error = <T as conduit_middleware::Transport>::Error>
            + Clone,
    {
        crate::Facade::new(self.build_config(), transport)
    }
}

impl Default for FacadeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn build_pipeline_config(
    config: &FacadeConfig,
    cache: Option<Cache<CachedResponse>>,
    coalescer: Option<Coalescer>,
) -> PipelineConfigBuilder {
    let mut builder = PipelineConfigBuilder::new().name(format!("{}-pipeline", config.name));

    if let Some(token_provider) = &config.token_provider {
        let token_provider = Arc::clone(token_provider);
        builder = builder.token_provider(move || {
            let token_provider = Arc::clone(&token_provider);
            async move { token_provider().await }
        });
    }

    if let (true, Some(cache)) = (config.enable_cache, cache) {
        builder = builder.cache(cache, config.cache_ttl);
    }

    if let Some(coalescer) = coalescer {
        builder = builder.coalescer(coalescer);
    }
    if config.enable_debounce {
        builder = builder.debounce_interval(config.debounce_interval);
    }
    if config.enable_throttle {
        builder = builder.throttle_interval(config.throttle_interval);
    }

    if let Some(response_handler) = &config.response_handler {
        let response_handler = Arc::clone(response_handler);
        builder = builder.response_handler(move |response| response_handler(response));
    }
    for (code, handler) in &config.code_handlers {
        let handler = Arc::clone(handler);
        builder = builder.code_handler(*code, move |response| handler(response));
    }

    if config.enable_double_token {
        let mut refresh_builder = RefreshConfigBuilder::new()
            .name(format!("{}-refresh", config.name))
            .access_token_expired_codes(config.access_token_expired_codes.iter().copied())
            .refresh_token_expired_codes(config.refresh_token_expired_codes.iter().copied());
        if let Some(refresh_fn) = &config.refresh_access_token {
            let refresh_fn = Arc::clone(refresh_fn);
            refresh_builder = refresh_builder.refresh_access_token(move || {
                let refresh_fn = Arc::clone(&refresh_fn);
                async move { refresh_fn().await }
            });
        }
        if let Some(on_expired) = &config.on_refresh_token_expired {
            let on_expired = Arc::clone(on_expired);
            refresh_builder = refresh_builder.on_refresh_token_expired(move || on_expired());
        }
        builder = builder.refresh(refresh_builder.build());
    }

    if let Some(middleware) = &config.request_middleware {
        let middleware = Arc::clone(middleware);
        builder = builder.request_middleware(move |request| middleware(request));
    }
    if let Some(middleware) = &config.request_cancel_middleware {
        let middleware = Arc::clone(middleware);
        builder = builder.request_cancel_middleware(move |request, kind| middleware(request, kind));
    }
    if let Some(middleware) = &config.response_middleware {
        let middleware = Arc::clone(middleware);
        builder = builder.response_middleware(move |response| middleware(response));
    }

    builder
}

//! Configuration for the [`crate::pipeline::MiddlewarePipeline`].

use crate::events::PipelineStageEvent;
use crate::refresh::RefreshController;
use crate::types::{RequestDescriptor, ResponseDescriptor};
use conduit_cache::Cache;
use conduit_coalesce::Coalescer;
use conduit_core::{CancelKind, EventListeners};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A cached response body, independent of the originating request.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub status_text: String,
    pub body: crate::types::ResponseBody,
}

pub type TokenProvider =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<String, String>> + Send>> + Send + Sync>;
pub type ResponseHandler = Arc<dyn Fn(ResponseDescriptor) -> ResponseDescriptor + Send + Sync>;
pub type CodeHandler = Arc<dyn Fn(&ResponseDescriptor) + Send + Sync>;
pub type RequestMiddleware = Arc<dyn Fn(&mut RequestDescriptor) + Send + Sync>;
pub type RequestCancelMiddleware = Arc<dyn Fn(&RequestDescriptor, CancelKind) + Send + Sync>;
pub type ResponseMiddleware = Arc<dyn Fn(&mut ResponseDescriptor) + Send + Sync>;

/// The code-handler re-entrancy lock's suppression window (spec §4.5 step 2).
pub const CODE_HANDLER_LOCK_WINDOW: Duration = Duration::from_secs(1);

pub struct PipelineConfig {
    pub(crate) token_provider: Option<TokenProvider>,
    pub(crate) cache: Option<Cache<CachedResponse>>,
    pub(crate) cache_ttl: Option<Duration>,
    pub(crate) coalescer: Option<Coalescer>,
    pub(crate) debounce_interval: Option<Duration>,
    pub(crate) throttle_interval: Option<Duration>,
    pub(crate) response_handler: Option<ResponseHandler>,
    pub(crate) code_handlers: HashMap<i64, CodeHandler>,
    pub(crate) code_lock: Arc<Mutex<HashMap<i64, Instant>>>,
    pub(crate) refresh: Option<RefreshController>,
    pub(crate) request_middleware: Option<RequestMiddleware>,
    pub(crate) request_cancel_middleware: Option<RequestCancelMiddleware>,
    pub(crate) response_middleware: Option<ResponseMiddleware>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<PipelineStageEvent>,
}

pub struct PipelineConfigBuilder {
    token_provider: Option<TokenProvider>,
    cache: Option<Cache<CachedResponse>>,
    cache_ttl: Option<Duration>,
    coalescer: Option<Coalescer>,
    debounce_interval: Option<Duration>,
    throttle_interval: Option<Duration>,
    response_handler: Option<ResponseHandler>,
    code_handlers: HashMap<i64, CodeHandler>,
    refresh: Option<RefreshController>,
    request_middleware: Option<RequestMiddleware>,
    request_cancel_middleware: Option<RequestCancelMiddleware>,
    response_middleware: Option<ResponseMiddleware>,
    name: String,
    event_listeners: EventListeners<PipelineStageEvent>,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            token_provider: None,
            cache: None,
            cache_ttl: None,
            coalescer: None,
            debounce_interval: None,
            throttle_interval: None,
            response_handler: None,
            code_handlers: HashMap::new(),
            refresh: None,
            request_middleware: None,
            request_cancel_middleware: None,
            response_middleware: None,
            name: "pipeline".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn token_provider<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        self.token_provider = Some(Arc::new(move || Box::pin(f())));
        self
    }

    /// Enables caching with the default per-entry TTL used when a write
    /// doesn't specify its own.
    pub fn cache(mut self, cache: Cache<CachedResponse>, default_ttl: Option<Duration>) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = default_ttl;
        self
    }

    pub fn coalescer(mut self, coalescer: Coalescer) -> Self {
        self.coalescer = Some(coalescer);
        self
    }

    pub fn debounce_interval(mut self, interval: Duration) -> Self {
        self.debounce_interval = Some(interval);
        self
    }

    pub fn throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = Some(interval);
        self
    }

    pub fn response_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(ResponseDescriptor) -> ResponseDescriptor + Send + Sync + 'static,
    {
        self.response_handler = Some(Arc::new(f));
        self
    }

    pub fn code_handler<F>(mut self, code: i64, f: F) -> Self
    where
        F: Fn(&ResponseDescriptor) + Send + Sync + 'static,
    {
        self.code_handlers.insert(code, Arc::new(f));
        self
    }

    pub fn refresh(mut self, refresh: RefreshController) -> Self {
        self.refresh = Some(refresh);
        self
    }

    pub fn request_middleware<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut RequestDescriptor) + Send + Sync + 'static,
    {
        self.request_middleware = Some(Arc::new(f));
        self
    }

    pub fn request_cancel_middleware<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestDescriptor, CancelKind) + Send + Sync + 'static,
    {
        self.request_cancel_middleware = Some(Arc::new(f));
        self
    }

    pub fn response_middleware<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ResponseDescriptor) + Send + Sync + 'static,
    {
        self.response_middleware = Some(Arc::new(f));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn build<T: crate::transport::Transport>(self, transport: T) -> crate::pipeline::MiddlewarePipeline<T> {
        let config = PipelineConfig {
            token_provider: self.token_provider,
            cache: self.cache,
            cache_ttl: self.cache_ttl,
            coalescer: self.coalescer,
            debounce_interval: self.debounce_interval,
            throttle_interval: self.throttle_interval,
            response_handler: self.response_handler,
            code_handlers: self.code_handlers,
            code_lock: Arc::new(Mutex::new(HashMap::new())),
            refresh: self.refresh,
            request_middleware: self.request_middleware,
            request_cancel_middleware: self.request_cancel_middleware,
            response_middleware: self.response_middleware,
            name: self.name,
            event_listeners: self.event_listeners,
        };
        crate::pipeline::MiddlewarePipeline::new(transport, config)
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

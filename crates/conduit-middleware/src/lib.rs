//! Request/response descriptors, the fixed pipeline and the dual-token
//! refresh controller (spec §3, §4.5, §4.6).

pub mod config;
pub mod events;
pub mod pipeline;
pub mod refresh;
pub mod transport;
pub mod types;

pub use config::{
    CachedResponse, CodeHandler, PipelineConfig, PipelineConfigBuilder, RequestCancelMiddleware,
    RequestMiddleware, ResponseHandler, ResponseMiddleware, TokenProvider,
};
pub use events::{PipelineStageEvent, RefreshEvent};
pub use pipeline::{MiddlewarePipeline, PipelineRequest};
pub use refresh::{RefreshConfig, RefreshConfigBuilder, RefreshController, RefreshOutcome};
pub use transport::{ProgressCallback, Transport, TransportFuture};
pub use types::{Body, Headers, Method, RequestDescriptor, ResponseBody, ResponseDescriptor, ResponseType};

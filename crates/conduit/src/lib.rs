//! Binds every manager crate behind a single client-side HTTP orchestration
//! facade: concurrency admission, caching, debounce/throttle, dual-token
//! refresh, retry, named cancellation, resumable chunked upload and
//! polling (spec §1, §6).

pub mod config;
pub mod facade;
pub mod factory;

pub use config::{FacadeConfig, FacadeConfigBuilder};
pub use facade::{Facade, PollingRequestConfig, RequestConfig};
pub use factory::Factory;

pub use conduit_core::{CancelKind, OrchestrationError};
pub use conduit_middleware::{
    Body, CachedResponse, Headers, Method, RequestDescriptor, ResponseBody, ResponseDescriptor,
    ResponseType, Transport,
};
pub use conduit_upload::{ChunkTransport, UploadError, UploadOutcome};

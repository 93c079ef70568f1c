//! Core infrastructure shared by every `conduit` manager.
//!
//! This crate provides:
//! - The event system used for observability (`events`)
//! - The shared error taxonomy (`error`)
//! - Canonical request-key derivation (`key`)

pub mod error;
pub mod events;
pub mod key;

pub use error::{CancelKind, OrchestrationError};
pub use events::{EventListener, EventListeners, FnListener, PipelineEvent};
pub use key::{key as request_key, KeyBody};

//! The admission gate described in spec §4.2: bounds in-flight operations
//! to *N*, queueing the rest in FIFO order.
//!
//! # Basic example
//!
//! ```rust
//! use conduit_concurrency::ConcurrencyController;
//!
//! # async fn example() {
//! let controller = ConcurrencyController::builder()
//!     .limit(10)
//!     .name("requests")
//!     .build();
//!
//! let result = controller.run(|| async { 1 + 1 }).await.unwrap();
//! assert_eq!(result, 2);
//! # }
//! ```
//!
//! # Unconstrained pass-through
//!
//! ```rust
//! use conduit_concurrency::ConcurrencyController;
//!
//! # async fn example() {
//! let controller = ConcurrencyController::builder().unconstrained().build();
//! controller.run(|| async {}).await.unwrap();
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod events;

pub use config::{ConcurrencyConfig, ConcurrencyConfigBuilder};
pub use controller::ConcurrencyController;
pub use error::{ConcurrencyError, Result};
pub use events::ConcurrencyEvent;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_do_not_panic() {
        let _controller = ConcurrencyConfig::builder().build();
    }

    #[test]
    fn event_types_match_variant() {
        use conduit_core::PipelineEvent;
        use std::time::{Duration, Instant};

        let event = ConcurrencyEvent::Admitted {
            pattern_name: "test".to_string(),
            timestamp: Instant::now(),
            active_calls: 1,
        };
        assert_eq!(event.event_type(), "admitted");
        assert_eq!(event.pattern_name(), "test");

        let event = ConcurrencyEvent::Rejected {
            pattern_name: "test".to_string(),
            timestamp: Instant::now(),
            limit: 10,
        };
        assert_eq!(event.event_type(), "rejected");

        let event = ConcurrencyEvent::Settled {
            pattern_name: "test".to_string(),
            timestamp: Instant::now(),
            duration: Duration::from_millis(5),
            failed: true,
        };
        assert_eq!(event.event_type(), "settled");
    }
}

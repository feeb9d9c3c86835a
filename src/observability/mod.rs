//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (per-method call counters)
//!
//! Consumers:
//!     → Log aggregation (stdout JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use self::metrics::{init_metrics, InMemoryMeter, PrometheusMeter, RequestMeter};

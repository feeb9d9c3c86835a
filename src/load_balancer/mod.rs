//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     config.servers (ordered host:port)
//!     → backend.rs (resolve + dial + HTTP/2 handshake, fatal on failure)
//!     → round_robin.rs (fixed set + cursor)
//!
//! Per call:
//!     StreamDirector → Balancer::select() → BackendConnection (clone)
//! ```
//!
//! # Design Decisions
//! - Backend membership is fixed after startup
//! - No health awareness: an established connection stays eligible even when
//!   the backend is down, failures surface as call errors
//! - Selection is the only shared mutable state on the call path

pub mod backend;
pub mod round_robin;

use thiserror::Error;

pub use backend::BackendConnection;
pub use round_robin::RoundRobinBalancer;

/// Picks the backend connection for the next call.
pub trait Balancer: Send + Sync {
    fn select(&self) -> BackendConnection;
}

/// Startup errors from building the backend set.
#[derive(Debug, Error)]
pub enum BalancerError {
    #[error("no backend servers configured")]
    NoBackends,
    #[error("failed to dial backend {target}: {source}")]
    Dial {
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

//! HTTP/2 serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (h2c)
//!     → server.rs (axum serve, connect info)
//!     → middleware/auth.rs    (reject unauthenticated)
//!     → middleware/cache.rs   (replay hit / store success)
//!     → middleware/metrics.rs (count per method)
//!     → proxy::relay (fallback for every path)
//!     → Send to client
//! ```

pub mod middleware;
pub mod server;

pub use server::{build_router, Gates, ProxyServer};

//! Request gates, applied in a fixed order around the relay.
//!
//! ```text
//! auth → cache (lookup) → metrics → relay → cache (store)
//! ```

pub mod auth;
pub mod cache;
pub mod metrics;

pub use auth::auth_middleware;
pub use cache::cache_middleware;
pub use self::metrics::metrics_middleware;

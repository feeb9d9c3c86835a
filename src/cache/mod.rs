//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! Call authenticated
//!     → ResponseCache::lookup(method)
//!         hit  → replay stored body, backend never called
//!         miss → rest of the pipeline runs
//!     → successful response (grpc-status 0)
//!     → ResponseCache::store(method, body) with a fixed TTL
//! ```
//!
//! # Design Decisions
//! - The key is the method path alone. Two calls to the same method with
//!   different payloads share one entry until it expires. This is the
//!   observable behaviour callers rely on today and is kept as is; it is a
//!   known correctness risk for methods whose result depends on the request.
//! - Store errors never reach the caller: read errors count as a miss,
//!   write errors are logged
//! - No single-flight: concurrent misses all go to a backend, last write wins
//! - Expiry belongs to the store; nothing here sweeps entries

pub mod memory;
pub mod redis;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;
pub use store::{CacheError, CacheStore};

/// How long a stored response stays valid.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// The cache gate's view of the store: lookups and writes that never fail.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResponseCache {
    /// A cache with the standard [`CACHE_TTL`].
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_ttl(store, CACHE_TTL)
    }

    pub fn with_ttl(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the stored response for `method`, treating store errors as a miss.
    pub async fn lookup(&self, method: &str) -> Option<Bytes> {
        match self.store.get(method).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(method = %method, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store `body` under `method`. Failures are logged and dropped.
    pub async fn store(&self, method: &str, body: Bytes) {
        match self.store.set(method, body, self.ttl).await {
            Ok(()) => tracing::info!(method = %method, "Cache miss for method. Data cached"),
            Err(e) => tracing::warn!(method = %method, error = %e, "Cache write failed"),
        }
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

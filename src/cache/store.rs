//! External key-value store seam for the response cache.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Errors talking to the cache store. Never surfaced to callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("invalid cache address: {0}")]
    InvalidAddress(String),
    #[error("cache store did not answer within {0:?}")]
    Timeout(Duration),
}

/// A key-value store with per-entry expiry. The store owns expiry; the
/// gateway never sweeps entries itself.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry. `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Write or overwrite an entry that expires after `ttl`.
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;
}

//! Redis-backed cache store.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisError};
use url::Url;

use crate::cache::store::{CacheError, CacheStore};
use crate::config::RedisConfig;

/// Upper bound on one store round trip, dial included.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(1);

/// Cache store on a remote Redis server.
///
/// The connection is opened on first use, so an unreachable Redis only turns
/// every lookup into a miss instead of blocking startup. Dialling happens
/// outside the lock: concurrent calls may race to connect and the last one
/// wins the slot. A connection that fails with an I/O error is dropped and
/// re-dialled by the next call.
pub struct RedisStore {
    client: Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    timeout: Duration,
}

impl RedisStore {
    pub fn new(config: &RedisConfig) -> Result<Self, CacheError> {
        let url = redis_url(config)?;
        let client = Client::open(url.as_str())?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            timeout: STORE_TIMEOUT,
        })
    }

    fn slot(&self) -> MutexGuard<'_, Option<MultiplexedConnection>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let cached = self.slot().clone();
        if let Some(conn) = cached {
            return Ok(conn);
        }

        let conn = self
            .bounded(self.client.get_multiplexed_async_connection())
            .await?;
        *self.slot() = Some(conn.clone());
        Ok(conn)
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if e.is_io_error() || e.is_connection_dropped() {
                    self.slot().take();
                }
                Err(e.into())
            }
            Err(_) => {
                self.slot().take();
                Err(CacheError::Timeout(self.timeout))
            }
        }
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("client", &self.client)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = self.bounded(conn.get(key)).await?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(conn.set_ex::<_, _, ()>(key, value.as_ref(), ttl.as_secs().max(1)))
            .await
    }
}

/// Build `redis://[:password@]host:port/db`, percent-encoding the password.
fn redis_url(config: &RedisConfig) -> Result<Url, CacheError> {
    let invalid = || CacheError::InvalidAddress(config.addr.clone());

    let mut url = Url::parse(&format!("redis://{}/{}", config.addr, config.db)).map_err(|_| invalid())?;
    if !config.password.is_empty() {
        url.set_password(Some(&config.password)).map_err(|_| invalid())?;
    }
    Ok(url)
}

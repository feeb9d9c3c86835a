//! Startup orchestration.
//!
//! The composition root: every stateful component is built here, in
//! dependency order, from the validated configuration.
//!
//! # Design Decisions
//! - Fail fast: bind and backend dial failures are fatal
//! - No partial start with a reduced backend set
//! - The cache store connects lazily and never blocks startup

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::cache::{CacheError, RedisStore, ResponseCache};
use crate::config::ProxyConfig;
use crate::http::{Gates, ProxyServer};
use crate::lifecycle::Shutdown;
use crate::load_balancer::{BalancerError, RoundRobinBalancer};
use crate::observability::{init_metrics, PrometheusMeter};
use crate::proxy::StreamDirector;
use crate::security::JwtAuthenticator;

/// Fatal errors while bringing the gateway up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Backends(#[from] BalancerError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Build every component from `config` and serve until `shutdown` fires.
pub async fn run(config: ProxyConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    if config.metrics.enabled {
        match config.metrics.address.parse::<SocketAddr>() {
            Ok(addr) => init_metrics(addr, shutdown.subscribe()).await,
            Err(_) => tracing::error!(
                metrics_address = %config.metrics.address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.bind_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| StartupError::Bind { addr: bind_address.clone(), source })?;

    let balancer = RoundRobinBalancer::connect(config.servers.as_slice()).await?;
    tracing::info!(backends = balancer.len(), "Backend connections established");

    let store = RedisStore::new(&config.redis)?;

    let gates = Gates {
        authenticator: Arc::new(JwtAuthenticator::new(config.jwt_secret.as_bytes())),
        cache: ResponseCache::new(Arc::new(store)),
        meter: Arc::new(PrometheusMeter),
    };
    let director = StreamDirector::new(Arc::new(balancer));

    ProxyServer::new(director, gates)
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}

//! Gateway server setup.
//!
//! # Responsibilities
//! - Compose the gates around the catch-all relay in their fixed order
//! - Serve HTTP/2 (h2c) on the configured listener
//! - Shut down gracefully on the lifecycle signal

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::cache::ResponseCache;
use crate::http::middleware::{auth_middleware, cache_middleware, metrics_middleware};
use crate::observability::RequestMeter;
use crate::proxy::{relay_handler, StreamDirector};
use crate::security::Authenticator;

/// The swappable pieces of the pipeline.
#[derive(Clone)]
pub struct Gates {
    pub authenticator: Arc<dyn Authenticator>,
    pub cache: ResponseCache,
    pub meter: Arc<dyn RequestMeter>,
}

/// gRPC gateway server.
pub struct ProxyServer {
    router: Router,
}

impl ProxyServer {
    pub fn new(director: StreamDirector, gates: Gates) -> Self {
        Self {
            router: build_router(director, gates),
        }
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Starting gRPC proxy server");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("gRPC proxy server stopped");
        Ok(())
    }
}

/// Build the router: no routes of its own, every method falls through to
/// the relay. Layers added last run first, so the order below reads
/// inside-out.
pub fn build_router(director: StreamDirector, gates: Gates) -> Router {
    Router::new()
        .fallback(relay_handler)
        .with_state(Arc::new(director))
        .layer(middleware::from_fn_with_state(gates.meter, metrics_middleware))
        .layer(middleware::from_fn_with_state(gates.cache, cache_middleware))
        .layer(middleware::from_fn_with_state(gates.authenticator, auth_middleware))
        .layer(TraceLayer::new_for_http())
}

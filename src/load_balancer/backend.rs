//! Backend connection abstraction.
//!
//! # Responsibilities
//! - Resolve the backend's `host:port` and establish one HTTP/2 (h2c)
//!   connection to it at startup
//! - Drive the connection on its own task
//! - Hand out cheap clones of the request sender to in-flight calls
//!
//! HTTP/2 multiplexes streams over the single connection, so any number of
//! calls may use the same `BackendConnection` concurrently.

use std::net::SocketAddr;

use axum::body::Body;
use hyper::{body::Incoming, client::conn::http2, Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::TcpStream;

use crate::load_balancer::BalancerError;

/// An established, reusable channel to one backend.
#[derive(Debug, Clone)]
pub struct BackendConnection {
    addr: SocketAddr,
    sender: http2::SendRequest<Body>,
}

impl BackendConnection {
    /// Dial `target` (`host:port`; names are resolved here) and complete the
    /// HTTP/2 handshake.
    pub async fn connect(target: &str) -> Result<Self, BalancerError> {
        let dial_error = |source: Box<dyn std::error::Error + Send + Sync>| BalancerError::Dial {
            target: target.to_string(),
            source,
        };

        let stream = TcpStream::connect(target).await.map_err(|e| dial_error(e.into()))?;
        let addr = stream.peer_addr().map_err(|e| dial_error(e.into()))?;
        let _ = stream.set_nodelay(true);

        let (sender, connection) = http2::handshake(TokioExecutor::new(), TokioIo::new(stream))
            .await
            .map_err(|e| dial_error(e.into()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(backend = %addr, error = %e, "Backend connection closed");
            }
        });

        tracing::info!(backend = %target, resolved = %addr, "Connected to backend");
        Ok(Self { addr, sender })
    }

    /// The resolved address this connection was dialled to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Open a new stream on the connection and wait for the response head.
    ///
    /// The response body keeps the stream alive; dropping either the future
    /// or the body resets the stream on the backend.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Incoming>, hyper::Error> {
        let mut sender = self.sender.clone();
        sender.ready().await?;
        sender.send_request(request).await
    }
}

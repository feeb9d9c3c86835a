//! Stream director: binds an inbound call to a backend connection.
//!
//! Method-agnostic by design. The director never looks at which method is
//! being called beyond logging it, so one gateway can front any set of
//! backend services.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::load_balancer::{BackendConnection, Balancer};

/// Metadata key carrying the caller's observed address to the backend.
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Outbound context for one call.
#[derive(Debug, Clone)]
pub struct Direction {
    /// Inbound metadata plus the forwarded-from field.
    pub headers: HeaderMap,
    /// The backend the call is relayed to.
    pub backend: BackendConnection,
}

/// Picks a backend and derives outbound metadata for each call.
#[derive(Clone)]
pub struct StreamDirector {
    balancer: Arc<dyn Balancer>,
}

impl StreamDirector {
    pub fn new(balancer: Arc<dyn Balancer>) -> Self {
        Self { balancer }
    }

    /// Direct a call to `method` from `peer`. Never fails once the balancer
    /// holds at least one backend.
    pub fn direct(&self, method: &str, inbound: &HeaderMap, peer: SocketAddr) -> Direction {
        let backend = self.balancer.select();
        tracing::info!(method = %method, peer = %peer, backend = %backend.addr(), "Request received");

        Direction {
            headers: forwarding_headers(inbound, peer),
            backend,
        }
    }
}

/// Copy `inbound` verbatim and set `x-forwarded-for` to `peer` (`ip:port`).
pub fn forwarding_headers(inbound: &HeaderMap, peer: SocketAddr) -> HeaderMap {
    let mut headers = inbound.clone();
    if let Ok(value) = HeaderValue::from_str(&peer.to_string()) {
        headers.insert(X_FORWARDED_FOR, value);
    }
    headers
}

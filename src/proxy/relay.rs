//! Transparent relay of a call to its backend.
//!
//! The relay streams request frames to the backend and response frames back
//! without decoding them. Message boundaries, headers and the backend's
//! `grpc-status`/`grpc-message` trailers reach the caller as sent.
//!
//! Lifetime: the outbound stream is owned by the response future and then by
//! the response body. When the caller goes away either is dropped and the
//! backend stream is reset, on every exit path.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{uri::Scheme, Request, Uri, Version},
    response::{IntoResponse, Response},
};

use crate::grpc::Status;
use crate::proxy::director::StreamDirector;

/// Catch-all handler for every method.
pub async fn relay_handler(
    State(director): State<Arc<StreamDirector>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let method = request.uri().path().to_string();
    let (parts, body) = request.into_parts();

    let direction = director.direct(&method, &parts.headers, peer);
    let backend_addr = direction.backend.addr();

    let uri = match backend_uri(backend_addr, &parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(method = %method, error = %e, "Failed to build backend URI");
            return Status::internal("failed to route call").into_response();
        }
    };

    let mut outbound = Request::new(body);
    *outbound.method_mut() = parts.method;
    *outbound.uri_mut() = uri;
    *outbound.version_mut() = Version::HTTP_2;
    *outbound.headers_mut() = direction.headers;

    match direction.backend.send(outbound).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::warn!(method = %method, backend = %backend_addr, error = %e, "Upstream call failed");
            Status::unavailable(format!("upstream unavailable: {e}")).into_response()
        }
    }
}

/// Rewrite `uri` to point at `addr`, keeping path and query.
fn backend_uri(addr: SocketAddr, uri: &Uri) -> Result<Uri, axum::http::Error> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(addr.to_string())
        .path_and_query(path_and_query)
        .build()
}

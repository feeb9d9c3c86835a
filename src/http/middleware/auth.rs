//! Authentication gate.
//! Rejects calls without a valid bearer token before any other work.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::grpc::Status;
use crate::security::Authenticator;

pub async fn auth_middleware(
    State(authenticator): State<Arc<dyn Authenticator>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match authenticator.authenticate(request.headers()) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::warn!(method = %request.uri().path(), error = %e, "Unauthorized access attempt");
            Status::unauthenticated(e.client_message()).into_response()
        }
    }
}

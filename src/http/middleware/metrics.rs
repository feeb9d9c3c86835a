//! Metrics gate. Counts the call, then always lets it through.

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use crate::observability::RequestMeter;

pub async fn metrics_middleware(
    State(meter): State<Arc<dyn RequestMeter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.uri().path();
    meter.observe(method);
    tracing::debug!(method = %method, "Metrics updated for method");
    next.run(request).await
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `grpc_requests_total` (counter): calls that reached the metrics gate,
//!   labelled by `method`
//!
//! # Design Decisions
//! - The gate only increments; exposition is a separate pull endpoint
//! - Counters live for the process lifetime, reset only on restart

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{routing::get, Router};
use dashmap::DashMap;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

pub const REQUESTS_TOTAL: &str = "grpc_requests_total";

/// Records one observation per call.
pub trait RequestMeter: Send + Sync {
    fn observe(&self, method: &str);
}

/// Meter backed by the global `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMeter;

impl RequestMeter for PrometheusMeter {
    fn observe(&self, method: &str) {
        metrics::counter!(REQUESTS_TOTAL, "method" => method.to_string()).increment(1);
    }
}

/// Meter that keeps its own per-method counts.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMeter {
    counts: Arc<DashMap<String, AtomicU64>>,
}

impl InMemoryMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, method: &str) -> u64 {
        self.counts
            .get(method)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }
}

impl RequestMeter for InMemoryMeter {
    fn observe(&self, method: &str) {
        if let Some(counter) = self.counts.get(method) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.counts
            .entry(method.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }
}

/// Router exposing `GET /metrics` in the Prometheus text format.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
}

/// Install the global Prometheus recorder and serve it on `addr`.
///
/// Failures are logged; the gateway keeps running without an endpoint.
pub async fn init_metrics(addr: SocketAddr, mut shutdown: broadcast::Receiver<()>) {
    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics recorder");
            return;
        }
    };
    metrics::describe_counter!(REQUESTS_TOTAL, "Total number of gRPC requests");

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(metrics_address = %addr, error = %e, "Failed to bind metrics listener");
            return;
        }
    };
    tracing::info!(address = %addr, "Metrics endpoint listening");

    tokio::spawn(async move {
        let result = axum::serve(listener, metrics_router(handle))
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "Metrics server failed");
        }
    });
}

//! gRPC gateway library.
//!
//! Accepts gRPC calls, runs them through authentication, response caching
//! and request metering, then relays them unmodified to one of a fixed set
//! of backends chosen round-robin.

pub mod cache;
pub mod config;
pub mod grpc;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod proxy;
pub mod security;

pub use config::ProxyConfig;
pub use http::{Gates, ProxyServer};
pub use lifecycle::Shutdown;

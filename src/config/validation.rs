//! Configuration validation.
//!
//! Serde handles the syntactic checks; this module checks that the values
//! make sense together. All problems are reported, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("port must be non-zero")]
    ZeroPort,
    #[error("at least one backend server is required")]
    NoServers,
    #[error("invalid backend address: {0}")]
    InvalidServer(String),
    #[error("jwt_secret must not be empty")]
    EmptySecret,
    #[error("invalid redis address: {0}")]
    InvalidRedisAddr(String),
    #[error("invalid metrics address: {0}")]
    InvalidMetricsAddr(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    if config.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }
    for server in &config.servers {
        if !is_host_port(server) {
            errors.push(ValidationError::InvalidServer(server.clone()));
        }
    }

    if config.jwt_secret.is_empty() {
        errors.push(ValidationError::EmptySecret);
    }

    if !is_host_port(&config.redis.addr) {
        errors.push(ValidationError::InvalidRedisAddr(config.redis.addr.clone()));
    }

    if config.metrics.enabled && config.metrics.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddr(config.metrics.address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Backends and Redis may be addressed by hostname, so only the shape is
/// checked here. Names are resolved when dialled.
fn is_host_port(addr: &str) -> bool {
    match addr.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

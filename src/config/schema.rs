//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Port the gRPC listener binds to on all interfaces.
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Ordered backend addresses (e.g., "127.0.0.1:50061").
    pub servers: Vec<String>,

    /// Shared HMAC secret used to verify bearer tokens.
    pub jwt_secret: String,

    /// Response cache store settings.
    pub redis: RedisConfig,

    /// Metrics exposition settings.
    pub metrics: MetricsConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 50051,
            log_level: "info".to_string(),
            servers: Vec::new(),
            jwt_secret: String::new(),
            redis: RedisConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Address the gRPC listener binds to.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// Redis connection settings for the response cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis address (e.g., "127.0.0.1:6379").
    pub addr: String,

    /// Password, empty when the server has no auth.
    pub password: String,

    /// Logical database index.
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:6379".to_string(),
            password: String::new(),
            db: 0,
        }
    }
}

/// Metrics exposition configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the metrics endpoint.
    pub enabled: bool,

    /// Metrics endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "0.0.0.0:9090".to_string(),
        }
    }
}

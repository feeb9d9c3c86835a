//! gRPC gateway.
//!
//! # Architecture Overview
//!
//! ```text
//! Client call
//!     → auth           (reject: UNAUTHENTICATED)
//!     → cache lookup   (hit: replay stored body)
//!     → metrics        (count per method)
//!     → director       (round-robin backend, x-forwarded-for)
//!     → relay          (stream frames both ways)
//!     → cache store    (successful responses only)
//!     → Client response
//! ```

use std::path::PathBuf;

use clap::Parser;

use grpc_gateway::config::load_config;
use grpc_gateway::lifecycle::{signals::spawn_signal_handler, startup, Shutdown};
use grpc_gateway::observability::init_logging;

#[derive(Parser)]
#[command(name = "grpc-gateway")]
#[command(about = "gRPC proxy with load balancing, caching, authentication and metrics", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging("error");
            tracing::error!(path = %cli.config.display(), error = %e, "Error reading config file");
            return Err(e.into());
        }
    };

    init_logging(&config.log_level);
    tracing::info!(
        port = config.port,
        backends = config.servers.len(),
        redis = %config.redis.addr,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    if let Err(e) = startup::run(config, shutdown).await {
        tracing::error!(error = %e, "Fatal error");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

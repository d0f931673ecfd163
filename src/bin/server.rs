//! LockKV Server Binary
//!
//! Starts the TCP server for LockKV.

use std::sync::Arc;

use clap::Parser;
use lockkv::network::Server;
use lockkv::{Config, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// LockKV Server
#[derive(Parser, Debug)]
#[command(name = "lockkv-server")]
#[command(about = "In-memory key-value store with advisory per-key locks")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8008")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Close connections idle for this many milliseconds (0 = never)
    #[arg(long, default_value = "0")]
    idle_timeout_ms: u64,

    /// Write timeout in milliseconds (0 = never)
    #[arg(long, default_value = "5000")]
    write_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lockkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("LockKV Server v{}", lockkv::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .read_timeout_ms(args.idle_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .build();

    let server = match Server::bind(config, Arc::new(Store::new())) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

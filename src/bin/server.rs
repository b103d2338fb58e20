//! AtlasCache Server Binary
//!
//! Hosts an in-memory backing store over TCP.

use std::sync::Arc;

use atlascache::network::Server;
use atlascache::{Config, MemoryBackend};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// AtlasCache Server
#[derive(Parser, Debug)]
#[command(name = "atlascache-server")]
#[command(about = "Backing key-value store for AtlasCache")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6380")]
    listen: String,

    /// Connection worker threads (max concurrent clients)
    #[arg(short, long, default_value = "64")]
    max_connections: usize,

    /// Interval between expired-entry sweeps, in milliseconds
    #[arg(short, long, default_value = "1000")]
    sweep_ms: u64,

    /// Idle read timeout per connection, in milliseconds
    #[arg(long, default_value = "5000")]
    read_timeout_ms: u64,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,atlascache=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("AtlasCache Server v{}", atlascache::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .sweep_interval_ms(args.sweep_ms)
        .read_timeout_ms(args.read_timeout_ms)
        .build();

    let backend = Arc::new(MemoryBackend::new());

    let server = match Server::bind(config, backend) {
        Ok(s) => s,
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

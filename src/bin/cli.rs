//! AtlasCache CLI Client
//!
//! Command-line interface for inspecting and editing a cache server.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use atlascache::{Backend, Cache, CacheError, Config, DirectStore, RemoteBackend};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// AtlasCache CLI
#[derive(Parser, Debug)]
#[command(name = "atlascache-cli")]
#[command(about = "CLI for an AtlasCache server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6380")]
    server: String,

    /// Key prefix applied to every identifier
    #[arg(short, long, default_value = "")]
    prefix: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by identifier
    Get {
        /// The identifier to get
        id: String,
    },

    /// Set a raw value
    Set {
        /// The identifier to set
        id: String,

        /// The value to store
        value: String,

        /// Time to live in seconds
        #[arg(long, default_value = "3600")]
        ttl: u64,
    },

    /// Delete a value
    Del {
        /// The identifier to delete
        id: String,
    },

    /// Expire a value some seconds from now
    Expire {
        /// The identifier to expire
        id: String,

        /// Seconds from now
        #[arg(long = "in")]
        seconds: u64,
    },

    /// Ping the server
    Ping,
}

fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        match e {
            CacheError::Miss => {
                println!("(nil)");
            }
            e => {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run(args: Args) -> atlascache::Result<()> {
    let config = Config::builder()
        .server_addr(&args.server)
        .prefix(&args.prefix)
        .build();

    let backend = Arc::new(RemoteBackend::new(&config));

    match args.command {
        Commands::Ping => {
            backend.ping()?;
            println!("PONG");
        }
        Commands::Get { id } => {
            let store = DirectStore::from_config(backend, &config)?;
            let value = store.get_raw(&id)?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        Commands::Set { id, value, ttl } => {
            let mut store = DirectStore::from_config(backend, &config)?
                .with_default_ttl(Duration::from_secs(ttl))?;
            store.set_raw(&id, value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { id } => {
            let mut store = DirectStore::from_config(backend, &config)?;
            store.delete(&id)?;
            println!("OK");
        }
        Commands::Expire { id, seconds } => {
            let mut store = DirectStore::from_config(backend, &config)?;
            store.expire(&id, SystemTime::now() + Duration::from_secs(seconds))?;
            println!("OK");
        }
    }

    Ok(())
}

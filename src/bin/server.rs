//! EmberKV Server Binary
//!
//! Replays the AOF, then starts the TCP server.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use emberkv::config::AofSyncStrategy;
use emberkv::network::Server;
use emberkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// When the AOF writer calls fsync
#[derive(Debug, Clone, Copy, ValueEnum)]
enum AppendFsync {
    /// After every record
    Always,
    /// After every `--fsync-batch` records
    Batch,
    /// Never; the OS decides
    No,
}

/// EmberKV Server
#[derive(Parser, Debug)]
#[command(name = "emberkv-server")]
#[command(about = "In-memory Redis-compatible key-value store")]
#[command(version)]
struct Args {
    /// Data directory (holds the AOF)
    #[arg(short, long, default_value = "./emberkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Number of logical databases
    #[arg(long, default_value = "16")]
    databases: usize,

    /// Disable the append-only file
    #[arg(long)]
    no_appendonly: bool,

    /// AOF file name inside the data directory
    #[arg(long, default_value = "appendonly.aof")]
    appendfilename: String,

    /// AOF fsync policy
    #[arg(long, value_enum, default_value = "batch")]
    appendfsync: AppendFsync,

    /// Records per fsync with `--appendfsync batch`
    #[arg(long, default_value = "100")]
    fsync_batch: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,emberkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("EmberKV Server v{}", emberkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let sync_strategy = match args.appendfsync {
        AppendFsync::Always => AofSyncStrategy::EveryWrite,
        AppendFsync::Batch => AofSyncStrategy::EveryNEntries {
            count: args.fsync_batch.max(1),
        },
        AppendFsync::No => AofSyncStrategy::Never,
    };

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .databases(args.databases)
        .append_only(!args.no_appendonly)
        .append_filename(&args.appendfilename)
        .aof_sync_strategy(sync_strategy)
        .build();

    // Open engine (replays the AOF before any client can connect)
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            engine.shutdown();
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
    }

    engine.shutdown();
    tracing::info!("Server stopped");
}

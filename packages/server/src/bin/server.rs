//! Rakugaki room server.
//!
//! Hosts drawing rooms over HTTP and WebSocket and keeps their strokes on disk.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin rakugaki-server -- --token-secret <secret>
//! cargo run --bin rakugaki-server -- --host 0.0.0.0 --port 3000 --data-dir /var/lib/rakugaki
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use rakugaki_server::{
    config::ServerConfig,
    infrastructure::repository::{FileRoomRepository, FileStrokeRepository},
    ui::Server,
};
use rakugaki_shared::{logger::setup_logger, time::SystemClock};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Parser, Debug)]
#[command(name = "rakugaki-server")]
#[command(about = "Collaborative drawing room server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Directory for room and stroke records
    #[arg(short = 'd', long, default_value = "data")]
    data_dir: PathBuf,

    /// Secret used to sign join tokens
    #[arg(long, env = "RAKUGAKI_TOKEN_SECRET")]
    token_secret: String,

    /// Close connections that stay silent for this many seconds
    #[arg(long, default_value = "600")]
    idle_timeout_secs: u64,

    /// Delete rooms inactive for this many days
    #[arg(long, default_value = "30")]
    retention_days: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Config
    // 2. Repositories
    // 3. Server (UseCases and AppState)

    // 1. Build config from flags
    let mut config = ServerConfig::new(args.token_secret);
    config.data_dir = args.data_dir;
    config.idle_timeout = Duration::from_secs(args.idle_timeout_secs);
    config.retention = Duration::from_secs(args.retention_days * SECS_PER_DAY);

    // 2. Open file-backed repositories
    let room_repository = match FileRoomRepository::open(&config.data_dir).await {
        Ok(repository) => Arc::new(repository),
        Err(e) => {
            tracing::error!("Failed to open room registry: {}", e);
            std::process::exit(1);
        }
    };
    let stroke_repository = match FileStrokeRepository::open(&config.data_dir).await {
        Ok(repository) => Arc::new(repository),
        Err(e) => {
            tracing::error!("Failed to open stroke store: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Storing rooms under {}", config.data_dir.display());

    // 3. Create and run the server
    let server = Server::new(
        &config,
        room_repository,
        stroke_repository,
        Arc::new(SystemClock),
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

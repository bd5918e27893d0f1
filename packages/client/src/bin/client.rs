//! Rakugaki command line participant.
//!
//! Joins a drawing room (or creates one), then reads commands from stdin:
//! `/line`, `/rect`, `/circle`, `/text`, `/undo`, `/redo`, `/clear`, or plain
//! text for chat. Reconnects with increasing delay when the connection drops.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin rakugaki-client -- --username alice --create "Sketches"
//! cargo run --bin rakugaki-client -- -u bob --room AbC123xyz --password hunter22
//! ```

use clap::Parser;

use rakugaki_client::{ClientOptions, run_client};
use rakugaki_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "rakugaki-client")]
#[command(about = "Collaborative drawing room client", long_about = None)]
struct Args {
    /// Name shown to other participants
    #[arg(short = 'u', long)]
    username: String,

    /// Server URL
    #[arg(short = 's', long, default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Id of the room to join
    #[arg(short = 'r', long, conflicts_with = "create")]
    room: Option<String>,

    /// Create a room with this name and join it
    #[arg(short = 'c', long)]
    create: Option<String>,

    /// Create the room as private (with --create)
    #[arg(long, requires = "create")]
    private: bool,

    /// Room password
    #[arg(short = 'P', long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let options = ClientOptions {
        server: args.server,
        room: args.room,
        create: args.create,
        private: args.private,
        password: args.password,
        username: args.username,
    };

    // Run the client
    if let Err(e) = run_client(options).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

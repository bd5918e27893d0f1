//! UI layer: HTTP API, WebSocket endpoint and the server runner.

mod handler;
mod server;
mod signal;
pub mod state;
mod sweeper;

pub use server::Server;
pub use signal::shutdown_signal;

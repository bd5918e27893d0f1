//! Rakugaki command line participant.
//!
//! Joins a room over the HTTP API, then draws, undoes, redoes and chats over
//! the WebSocket session. Reconnects with increasing delay when the
//! connection drops.

pub mod api;
pub mod command;
pub mod error;
pub mod formatter;
pub mod history;
pub mod runner;
mod session;
mod ui;

pub use runner::{ClientOptions, run_client};

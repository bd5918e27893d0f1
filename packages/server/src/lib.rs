//! Rakugaki room server.
//!
//! Rooms are created over HTTP, joined with a short-lived signed token and
//! then synchronized over a WebSocket: strokes, undo/redo, canvas clears and
//! chat are fanned out to every participant of the room.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;

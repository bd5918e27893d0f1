//! Code shared between the Rakugaki server and client.
//!
//! The JSON contract (strokes, WebSocket frames and HTTP bodies) lives here so
//! both sides serialize through the same types.

pub mod http;
pub mod logger;
pub mod protocol;
pub mod stroke;
pub mod time;

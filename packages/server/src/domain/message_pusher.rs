//! Outbound channel to a connected participant.
//!
//! The WebSocket writer task owns the socket sink and drains this channel;
//! the room runtime only ever enqueues. Enqueueing never blocks, so a slow
//! peer cannot stall the room.

use tokio::sync::mpsc;

/// Frame queued for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Serialized JSON frame
    Text(String),
    /// Close the socket with a WebSocket close code
    Close { code: u16, reason: String },
}

/// Sender half handed to the room runtime at admission.
pub type PusherChannel = mpsc::UnboundedSender<Outbound>;

//! WebSocket wire protocol.
//!
//! Every frame is a JSON object whose `method` field selects the variant.
//! Unknown methods deserialize to `Unknown` so that newer peers can add
//! messages without breaking older ones.

use serde::{Deserialize, Serialize};

use crate::stroke::Stroke;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndoTag {
    #[serde(rename = "undo")]
    Undo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedoTag {
    #[serde(rename = "redo")]
    Redo,
}

/// `{type: "undo", strokeId}` sub-message of `draw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoFigure {
    pub r#type: UndoTag,
    pub stroke_id: String,
}

/// `{type: "redo", stroke}` sub-message of `draw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedoFigure {
    pub r#type: RedoTag,
    pub stroke: Stroke,
}

/// Payload of a `draw` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Figure {
    Undo(UndoFigure),
    Redo(RedoFigure),
    Stroke(Stroke),
}

impl Figure {
    pub fn undo(stroke_id: impl Into<String>) -> Self {
        Figure::Undo(UndoFigure {
            r#type: UndoTag::Undo,
            stroke_id: stroke_id.into(),
        })
    }

    pub fn redo(stroke: Stroke) -> Self {
        Figure::Redo(RedoFigure {
            r#type: RedoTag::Redo,
            stroke,
        })
    }
}

/// Frames sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Handshake; `id` is the room id.
    Connection {
        id: String,
        username: String,
        token: String,
    },
    Draw {
        id: String,
        username: String,
        figure: Figure,
    },
    Clear {
        username: String,
    },
    Chat {
        username: String,
        message: String,
    },
    #[serde(other)]
    Unknown,
}

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ServerMessage {
    /// A peer joined.
    Connection {
        username: String,
    },
    Draw {
        id: String,
        username: String,
        figure: Figure,
    },
    Clear {
        username: String,
    },
    Chat {
        username: String,
        message: String,
        timestamp: i64,
    },
    /// Full stroke snapshot, sent once per admission.
    Draws {
        strokes: Vec<Stroke>,
    },
    /// Full membership list.
    Users {
        users: Vec<String>,
    },
    Disconnection {
        username: String,
    },
    /// Notice delivered only to the connection that caused it.
    Error {
        message: String,
    },
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// WebSocket close codes used by the server.
pub mod close_code {
    /// Invalid token, malformed handshake or rate limit exceeded.
    pub const POLICY_VIOLATION: u16 = 1008;
    pub const IDLE_TIMEOUT: u16 = 4000;
    pub const ROOM_FULL: u16 = 4003;
    pub const ROOM_NOT_FOUND: u16 = 4004;
    pub const USERNAME_TAKEN: u16 = 4009;
    /// Server is shutting down.
    pub const GOING_AWAY: u16 = 1001;
    /// The server could not read the room state.
    pub const INTERNAL_ERROR: u16 = 1011;
}

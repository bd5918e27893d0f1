//! Server configuration and protocol limits.

use std::{path::PathBuf, time::Duration};

/// Maximum number of concurrent participants in one room.
pub const MAX_USERS_PER_ROOM: usize = 10;
/// Number of chat messages kept per active room.
pub const CHAT_HISTORY_LIMIT: usize = 100;
/// Maximum length of a room name, in characters.
pub const ROOM_NAME_MAX_CHARS: usize = 100;
/// Maximum length of a username, in characters.
pub const USERNAME_MAX_CHARS: usize = 32;
/// Maximum length of a chat message, in characters.
pub const CHAT_MESSAGE_MAX_CHARS: usize = 500;
/// Maximum length of the text carried by a text stroke, in characters.
pub const STROKE_TEXT_MAX_CHARS: usize = 1000;
/// Validity of a join token.
pub const JOIN_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Runtime configuration of the server.
///
/// Built from command line flags in the binary; tests use [`ServerConfig::new`]
/// and override individual fields.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding the room registry and stroke records
    pub data_dir: PathBuf,
    /// HMAC secret used to sign join tokens
    pub token_secret: String,
    pub max_users_per_room: usize,
    pub chat_history_limit: usize,
    /// Connections silent for longer than this are closed
    pub idle_timeout: Duration,
    pub idle_sweep_interval: Duration,
    /// Rooms whose last activity is older than this are deleted
    pub retention: Duration,
    pub retention_sweep_interval: Duration,
    pub rate_limit_window: Duration,
    pub rate_limit_max_messages: usize,
    /// Time a fresh socket has to send its `connection` frame
    pub handshake_timeout: Duration,
}

impl ServerConfig {
    pub fn new(token_secret: impl Into<String>) -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            token_secret: token_secret.into(),
            max_users_per_room: MAX_USERS_PER_ROOM,
            chat_history_limit: CHAT_HISTORY_LIMIT,
            idle_timeout: Duration::from_secs(10 * 60),
            idle_sweep_interval: Duration::from_secs(60),
            retention: Duration::from_secs(30 * 24 * 60 * 60),
            retention_sweep_interval: Duration::from_secs(60 * 60),
            rate_limit_window: Duration::from_secs(1),
            rate_limit_max_messages: 50,
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

//! Domain layer errors.

use thiserror::Error;

/// Value object construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("Invalid room id '{0}'")]
    InvalidRoomId(String),

    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Username must be at most {0} characters")]
    UsernameTooLong(usize),

    #[error("Room name must not be empty")]
    EmptyRoomName,

    #[error("Room name must be at most {0} characters")]
    RoomNameTooLong(usize),
}

/// Errors raised by the durable stores
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored record is invalid: {0}")]
    Corrupted(String),
}

/// Errors raised while admitting a participant into a session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("Room is full ({0} participants)")]
    RoomFull(usize),

    #[error("Username '{0}' is already taken in this room")]
    UsernameTaken(String),
}

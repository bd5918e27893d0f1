//! Durable room metadata.

use crate::domain::value_object::{RoomId, RoomName, Timestamp, Visibility};

/// Registry entry of a room.
///
/// A public room never carries a password hash. A private room without a hash
/// is joinable without credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub name: RoomName,
    pub visibility: Visibility,
    password_hash: Option<String>,
    pub created_at: Timestamp,
    pub last_activity_at: Timestamp,
}

impl Room {
    /// Create a room. The hash is dropped for public rooms.
    pub fn new(
        id: RoomId,
        name: RoomName,
        visibility: Visibility,
        password_hash: Option<String>,
        created_at: Timestamp,
    ) -> Self {
        let password_hash = match visibility {
            Visibility::Public => None,
            Visibility::Private => password_hash,
        };
        Self {
            id,
            name,
            visibility,
            password_hash,
            created_at,
            last_activity_at: created_at,
        }
    }

    /// Rebuild a room from a stored record.
    pub fn restore(
        id: RoomId,
        name: RoomName,
        visibility: Visibility,
        password_hash: Option<String>,
        created_at: Timestamp,
        last_activity_at: Timestamp,
    ) -> Self {
        let mut room = Self::new(id, name, visibility, password_hash, created_at);
        room.last_activity_at = last_activity_at;
        room
    }

    pub fn is_public(&self) -> bool {
        self.visibility.is_public()
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn password_hash(&self) -> Option<&str> {
        self.password_hash.as_deref()
    }

    /// Whether the room has been idle for longer than `retention_millis` at `now`.
    pub fn is_expired(&self, now: Timestamp, retention_millis: i64) -> bool {
        self.last_activity_at.elapsed_until(now) > retention_millis
    }
}

//! File-backed room registry.
//!
//! One JSON record per room under `<data_dir>/rooms/`. The stored record
//! (`RoomRecord`) is converted to and from the `Room` entity at this
//! boundary so the on-disk format can evolve separately from the domain.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::store::JsonFileStore;
use crate::domain::{
    RepositoryError, Room, RoomId, RoomName, RoomRepository, Timestamp, Visibility,
};

/// On-disk form of a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub id: String,
    pub name: String,
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub created_at: i64,
    pub last_activity_at: i64,
}

impl From<&Room> for RoomRecord {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.as_str().to_string(),
            name: room.name.as_str().to_string(),
            visibility: room.visibility,
            password_hash: room.password_hash().map(str::to_string),
            created_at: room.created_at.value(),
            last_activity_at: room.last_activity_at.value(),
        }
    }
}

impl TryFrom<RoomRecord> for Room {
    type Error = RepositoryError;

    fn try_from(record: RoomRecord) -> Result<Self, Self::Error> {
        let id = RoomId::new(record.id).map_err(|e| RepositoryError::Corrupted(e.to_string()))?;
        let name =
            RoomName::new(record.name).map_err(|e| RepositoryError::Corrupted(e.to_string()))?;
        Ok(Room::restore(
            id,
            name,
            record.visibility,
            record.password_hash,
            Timestamp::new(record.created_at),
            Timestamp::new(record.last_activity_at),
        ))
    }
}

pub struct FileRoomRepository {
    store: JsonFileStore,
}

impl FileRoomRepository {
    pub async fn open(data_dir: &Path) -> Result<Self, RepositoryError> {
        Ok(Self {
            store: JsonFileStore::open(data_dir.join("rooms")).await?,
        })
    }
}

#[async_trait]
impl RoomRepository for FileRoomRepository {
    async fn create(&self, room: &Room) -> Result<(), RepositoryError> {
        self.store
            .write(room.id.as_str(), &RoomRecord::from(room))
            .await
    }

    async fn find(&self, id: &RoomId) -> Result<Option<Room>, RepositoryError> {
        self.store
            .read::<RoomRecord>(id.as_str())
            .await?
            .map(Room::try_from)
            .transpose()
    }

    async fn touch(&self, id: &RoomId, at: Timestamp) -> Result<(), RepositoryError> {
        let found = self
            .store
            .update::<RoomRecord, _>(id.as_str(), |record| {
                record.last_activity_at = record.last_activity_at.max(at.value());
            })
            .await?;
        if !found {
            return Err(RepositoryError::RoomNotFound(id.as_str().to_string()));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Room>, RepositoryError> {
        let mut rooms = Vec::new();
        for key in self.store.keys().await? {
            match self.store.read::<RoomRecord>(&key).await {
                Ok(Some(record)) => match Room::try_from(record) {
                    Ok(room) => rooms.push(room),
                    Err(e) => tracing::warn!("Skipping room record '{}': {}", key, e),
                },
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping unreadable room record '{}': {}", key, e),
            }
        }
        Ok(rooms)
    }

    async fn delete(&self, id: &RoomId) -> Result<(), RepositoryError> {
        self.store.remove(id.as_str()).await
    }
}

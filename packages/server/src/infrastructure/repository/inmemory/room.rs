//! InMemory Repository 実装
//!
//! ドメイン層が定義する RoomRepository / StrokeRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。テストと `--in-memory` 起動用で、
//! プロセス終了とともに内容は失われます。
//!
//! ファイル実装と同じく、ストロークの保存はリビジョンで順序付けされ、
//! 古いリビジョンの書き込みは捨てられます。

use std::collections::HashMap;

use async_trait::async_trait;
use rakugaki_shared::stroke::Stroke;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, Room, RoomId, RoomRepository, StrokeRepository, Timestamp};

/// インメモリ Room Repository 実装
///
/// Room ドメインモデルをそのまま保持します（依存性の逆転）。
#[derive(Default)]
pub struct InMemoryRoomRepository {
    rooms: Mutex<HashMap<RoomId, Room>>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn create(&self, room: &Room) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        rooms.insert(room.id.clone(), room.clone());
        Ok(())
    }

    async fn find(&self, id: &RoomId) -> Result<Option<Room>, RepositoryError> {
        let rooms = self.rooms.lock().await;
        Ok(rooms.get(id).cloned())
    }

    async fn touch(&self, id: &RoomId, at: Timestamp) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(id)
            .ok_or_else(|| RepositoryError::RoomNotFound(id.as_str().to_string()))?;
        room.last_activity_at = room.last_activity_at.max(at);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Room>, RepositoryError> {
        let rooms = self.rooms.lock().await;
        let mut list: Vec<Room> = rooms.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(list)
    }

    async fn delete(&self, id: &RoomId) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        rooms.remove(id);
        Ok(())
    }
}

/// インメモリ Stroke Repository 実装
///
/// ルームごとに「最後に書き込んだリビジョン」とストロークリストを保持します。
#[derive(Default)]
pub struct InMemoryStrokeRepository {
    strokes: Mutex<HashMap<RoomId, (u64, Vec<Stroke>)>>,
}

impl InMemoryStrokeRepository {
    /// 新しい InMemoryStrokeRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StrokeRepository for InMemoryStrokeRepository {
    async fn load(&self, id: &RoomId) -> Result<Vec<Stroke>, RepositoryError> {
        let strokes = self.strokes.lock().await;
        Ok(strokes
            .get(id)
            .map(|(_, list)| list.clone())
            .unwrap_or_default())
    }

    async fn save(
        &self,
        id: &RoomId,
        revision: u64,
        list: &[Stroke],
    ) -> Result<bool, RepositoryError> {
        let mut strokes = self.strokes.lock().await;
        let stale = strokes
            .get(id)
            .is_some_and(|(last_revision, _)| revision < *last_revision);
        if stale {
            return Ok(false);
        }
        strokes.insert(id.clone(), (revision, list.to_vec()));
        Ok(true)
    }

    async fn delete(&self, id: &RoomId) -> Result<(), RepositoryError> {
        let mut strokes = self.strokes.lock().await;
        strokes.remove(id);
        Ok(())
    }
}

//! UseCase: ルームのメタデータ取得

use std::sync::Arc;

use crate::domain::{RepositoryError, Room, RoomId, RoomRepository};

/// ルーム取得のユースケース
pub struct GetRoomUseCase {
    room_repository: Arc<dyn RoomRepository>,
}

impl GetRoomUseCase {
    pub fn new(room_repository: Arc<dyn RoomRepository>) -> Self {
        Self { room_repository }
    }

    /// 形式として不正な ID は「存在しない」として扱います。
    pub async fn execute(&self, room_id: &str) -> Result<Option<Room>, RepositoryError> {
        let Ok(id) = RoomId::new(room_id.to_string()) else {
            return Ok(None);
        };
        self.room_repository.find(&id).await
    }
}

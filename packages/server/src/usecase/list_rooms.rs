//! UseCase: 公開ルームの一覧
//!
//! 非公開ルームは一覧に含めません。アクティブなユーザー数はセッションから
//! 取得します（アイドル中のルームは 0）。

use std::sync::Arc;

use crate::{
    domain::{RepositoryError, Room, RoomRepository},
    infrastructure::session::SessionRegistry,
};

/// 一覧の 1 行
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSummary {
    pub room: Room,
    pub active_users: usize,
}

/// ルーム一覧取得のユースケース
pub struct ListRoomsUseCase {
    room_repository: Arc<dyn RoomRepository>,
    registry: Arc<SessionRegistry>,
}

impl ListRoomsUseCase {
    pub fn new(room_repository: Arc<dyn RoomRepository>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            room_repository,
            registry,
        }
    }

    /// 公開ルームを最近アクティブな順に返します。
    pub async fn execute(&self) -> Result<Vec<RoomSummary>, RepositoryError> {
        let mut rooms: Vec<Room> = self
            .room_repository
            .list()
            .await?
            .into_iter()
            .filter(Room::is_public)
            .collect();
        rooms.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));

        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            let active_users = self.registry.participant_count(&room.id).await;
            summaries.push(RoomSummary { room, active_users });
        }
        Ok(summaries)
    }
}

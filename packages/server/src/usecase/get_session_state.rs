//! UseCase: アクティブなセッションの状態取得（デバッグ用）

use std::sync::Arc;

use crate::{
    domain::{ChatEntry, RoomId},
    infrastructure::session::SessionRegistry,
};

/// セッションのスナップショット
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub room_id: RoomId,
    pub users: Vec<String>,
    pub stroke_count: usize,
    pub chat: Vec<ChatEntry>,
}

pub struct GetSessionStateUseCase {
    registry: Arc<SessionRegistry>,
}

impl GetSessionStateUseCase {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// ルームがアクティブでなければ `None` を返します。
    pub async fn execute(&self, room_id: &str) -> Option<SessionState> {
        let id = RoomId::new(room_id.to_string()).ok()?;
        let shared = self.registry.get(&id).await?;
        let session = shared.lock().await;
        Some(SessionState {
            room_id: id,
            users: session.usernames(),
            stroke_count: session.history.len(),
            chat: session.chat_log().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Visibility,
        usecase::{SendChatUseCase, fixture::TestEnv},
    };

    #[tokio::test]
    async fn test_state_of_active_room() {
        // テスト項目: アクティブなルームの参加者とチャットログが取得できる
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let (alice, _rx) = env.join(&room, "alice").await;
        SendChatUseCase::new(env.rooms.clone(), env.registry.clone(), env.clock.clone())
            .execute(&alice, "alice", "hi")
            .await
            .unwrap();
        let usecase = GetSessionStateUseCase::new(env.registry.clone());

        // when (操作):
        let state = usecase.execute(room.id.as_str()).await.unwrap();

        // then (期待する結果):
        assert_eq!(state.users, vec!["alice".to_string()]);
        assert_eq!(state.stroke_count, 0);
        assert_eq!(state.chat.len(), 1);
        assert_eq!(state.chat[0].message, "hi");
    }

    #[tokio::test]
    async fn test_idle_room_has_no_state() {
        // テスト項目: アイドル中のルームは None になる
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let usecase = GetSessionStateUseCase::new(env.registry.clone());

        // when (操作):
        let state = usecase.execute(room.id.as_str()).await;

        // then (期待する結果):
        assert!(state.is_none());
    }
}

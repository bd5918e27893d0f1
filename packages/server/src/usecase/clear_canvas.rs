//! UseCase: キャンバスの全消去

use std::sync::Arc;

use rakugaki_shared::{protocol::ServerMessage, time::Clock};

use crate::{
    domain::{RoomRepository, Timestamp},
    infrastructure::session::SessionRegistry,
};

use super::{Admission, error::DrawError, touch_room_in_background};

/// キャンバス全消去のユースケース
pub struct ClearCanvasUseCase {
    room_repository: Arc<dyn RoomRepository>,
    registry: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
}

impl ClearCanvasUseCase {
    /// 新しい ClearCanvasUseCase を作成
    pub fn new(
        room_repository: Arc<dyn RoomRepository>,
        registry: Arc<SessionRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            room_repository,
            registry,
            clock,
        }
    }

    /// ストロークリストを空にし、送信者以外へ `clear` を配信
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 削除したストロークの数
    pub async fn execute(&self, admission: &Admission, username: &str) -> Result<usize, DrawError> {
        if !admission.is_claimed_by(username, None) {
            return Err(DrawError::IdentityMismatch);
        }
        let shared = self
            .registry
            .get(&admission.room_id)
            .await
            .ok_or(DrawError::NotMember)?;
        let mut session = shared.lock().await;
        if !session.is_member(&admission.username, admission.connection_id) {
            return Err(DrawError::NotMember);
        }

        let now = Timestamp::new(self.clock.now_millis());
        session.touch(&admission.username, now);
        let removed = session.history.clear();
        self.registry.persist_in_background(&session);
        session.broadcast(
            &ServerMessage::Clear {
                username: admission.username.as_str().to_string(),
            },
            Some(&admission.username),
        );
        tracing::info!(
            "'{}' cleared room '{}' ({} stroke(s) removed)",
            admission.username,
            admission.room_id,
            removed
        );
        drop(session);

        touch_room_in_background(self.room_repository.clone(), admission.room_id.clone(), now);
        Ok(removed)
    }
}

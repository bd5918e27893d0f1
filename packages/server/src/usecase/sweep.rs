//! UseCase: 定期スイープとシャットダウン時の書き出し
//!
//! - `evict_idle`: 一定時間操作のない接続にクローズを要求する。ソケットが
//!   閉じると通常の退室処理が走る
//! - `purge_expired`: 保持期間を超えて使われていないルームとストロークを削除
//! - `flush_all`: 全セッションを書き出し、全接続にクローズを要求する

use std::{sync::Arc, time::Duration};

use rakugaki_shared::{protocol::close_code, time::Clock};

use crate::{
    domain::{RepositoryError, RoomRepository, StrokeRepository, Timestamp},
    infrastructure::session::SessionRegistry,
};

pub struct SweepUseCase {
    room_repository: Arc<dyn RoomRepository>,
    stroke_repository: Arc<dyn StrokeRepository>,
    registry: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
    idle_timeout: Duration,
    retention: Duration,
}

impl SweepUseCase {
    pub fn new(
        room_repository: Arc<dyn RoomRepository>,
        stroke_repository: Arc<dyn StrokeRepository>,
        registry: Arc<SessionRegistry>,
        clock: Arc<dyn Clock>,
        idle_timeout: Duration,
        retention: Duration,
    ) -> Self {
        Self {
            room_repository,
            stroke_repository,
            registry,
            clock,
            idle_timeout,
            retention,
        }
    }

    /// アイドル接続にクローズを要求し、その数を返します。
    pub async fn evict_idle(&self) -> usize {
        let now = Timestamp::new(self.clock.now_millis());
        let timeout = self.idle_timeout.as_millis() as i64;
        let mut evicted = 0;
        for (room_id, shared) in self.registry.active().await {
            let session = shared.lock().await;
            for username in session.idle_participants(now, timeout) {
                if session.close_participant(&username, close_code::IDLE_TIMEOUT, "Idle timeout") {
                    tracing::info!("Evicting idle '{}' from room '{}'", username, room_id);
                    evicted += 1;
                }
            }
        }
        evicted
    }

    /// 保持期間を過ぎたルームを削除し、その数を返します。接続中のルームは対象外です。
    pub async fn purge_expired(&self) -> Result<usize, RepositoryError> {
        let now = Timestamp::new(self.clock.now_millis());
        let retention = self.retention.as_millis() as i64;
        let mut purged = 0;
        for room in self.room_repository.list().await? {
            if !room.is_expired(now, retention) {
                continue;
            }
            if self.registry.participant_count(&room.id).await > 0 {
                continue;
            }
            if let Err(e) = self.stroke_repository.delete(&room.id).await {
                tracing::warn!("Failed to delete strokes of room '{}': {}", room.id, e);
                continue;
            }
            self.room_repository.delete(&room.id).await?;
            tracing::info!("Purged expired room '{}'", room.id);
            purged += 1;
        }
        Ok(purged)
    }

    /// 全セッションを書き出し、全接続に going-away でクローズを要求します。
    pub async fn flush_all(&self) -> usize {
        let mut flushed = 0;
        for (room_id, shared) in self.registry.active().await {
            let session = shared.lock().await;
            session.close_all(close_code::GOING_AWAY, "Server shutting down");
            match self.registry.flush(&session).await {
                Ok(()) => flushed += 1,
                Err(e) => tracing::warn!("Failed to flush room '{}': {}", room_id, e),
            }
        }
        flushed
    }
}

//! UseCase: 参加者の退室
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - 退室の通知と、最後の参加者が抜けたときのセッション破棄
//!
//! ### なぜこのテストが必要か
//! - 最後の退室時にストロークがディスクへ書き出され、メモリが解放されることを保証
//! - 同名で入り直した新しい接続を、古い接続の切断処理が消さないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者が残るルームからの退室（通知あり）
//! - 正常系：最後の参加者の退室（フラッシュと破棄）
//! - エッジケース：既に置き換えられた接続の退室（何もしない）

use std::sync::Arc;

use rakugaki_shared::protocol::ServerMessage;

use crate::infrastructure::session::SessionRegistry;

use super::Admission;

/// 退室処理の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// 参加者が残っており、退室が通知された
    Left { remaining: usize },
    /// 最後の参加者だったため、セッションが書き出されて破棄された
    SessionClosed,
    /// この接続は既にメンバーではなかった
    NotMember,
}

/// 参加者退室のユースケース
pub struct DisconnectParticipantUseCase {
    registry: Arc<SessionRegistry>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// 退室を実行
    ///
    /// 切断・エラー・アイドルタイムアウトのいずれでもこの経路を通ります。
    /// 永続化の失敗はログに残すだけで、セッションの破棄は止めません。
    pub async fn execute(&self, admission: &Admission) -> DisconnectOutcome {
        let Some(shared) = self.registry.get(&admission.room_id).await else {
            return DisconnectOutcome::NotMember;
        };
        let mut session = shared.lock().await;
        if session
            .remove(&admission.username, admission.connection_id)
            .is_none()
        {
            return DisconnectOutcome::NotMember;
        }
        tracing::info!(
            "'{}' left room '{}'",
            admission.username,
            admission.room_id
        );

        if session.is_empty() {
            session.close();
            if let Err(e) = self.registry.flush(&session).await {
                tracing::warn!(
                    "Failed to flush room '{}' on last leave: {}",
                    admission.room_id,
                    e
                );
            }
            self.registry.discard(&admission.room_id, &shared).await;
            tracing::info!("Room '{}' is now idle", admission.room_id);
            return DisconnectOutcome::SessionClosed;
        }

        session.broadcast(
            &ServerMessage::Disconnection {
                username: admission.username.as_str().to_string(),
            },
            None,
        );
        session.broadcast(
            &ServerMessage::Users {
                users: session.usernames(),
            },
            None,
        );
        DisconnectOutcome::Left {
            remaining: session.participant_count(),
        }
    }
}

//! UseCase: 描画（追加・undo・redo）
//!
//! - 通常の図形：ストロークリストに追加し、非同期で永続化して送信者以外へ配信
//! - undo：ストローク ID で削除（作者本人のみ）
//! - redo：クライアントが保持していたストロークを再追加（作者本人のみ）し、
//!   通常の追加として配信
//!
//! undo / redo の認可エラーは送信者にも通知しません（`DrawError::Rejected`）。

use std::sync::Arc;

use rakugaki_shared::{
    protocol::{Figure, ServerMessage},
    stroke::Stroke,
    time::Clock,
};

use crate::{
    config::STROKE_TEXT_MAX_CHARS,
    domain::{RoomRepository, Timestamp, guard::sanitize_text},
    infrastructure::session::SessionRegistry,
};

use super::{Admission, error::DrawError, touch_room_in_background};

/// 描画のユースケース
pub struct DrawUseCase {
    room_repository: Arc<dyn RoomRepository>,
    registry: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
}

impl DrawUseCase {
    /// 新しい DrawUseCase を作成
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

    /// 描画メッセージを適用
    ///
    /// # Arguments
    ///
    /// * `admission` - 送信元の接続の身元
    /// * `room_id` / `username` - メッセージが名乗る身元（接続の身元と一致が必須）
    /// * `figure` - 図形、または undo / redo サブメッセージ
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 配信した相手の数
    /// * `Err(DrawError)` - 適用されなかった（状態は変わらない）
    pub async fn execute(
        &self,
        admission: &Admission,
        room_id: &str,
        username: &str,
        figure: Figure,
    ) -> Result<usize, DrawError> {
        if !admission.is_claimed_by(username, Some(room_id)) {
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

        let figure = match figure {
            Figure::Stroke(stroke) => {
                let stroke = sanitize_stroke(stroke)?;
                session.history.add(stroke.clone(), &admission.username)?;
                Figure::Stroke(stroke)
            }
            Figure::Undo(undo) => {
                session
                    .history
                    .undo(&undo.stroke_id, &admission.username)?;
                Figure::Undo(undo)
            }
            Figure::Redo(redo) => {
                let stroke = sanitize_stroke(redo.stroke)?;
                session.history.redo(stroke.clone(), &admission.username)?;
                Figure::Stroke(stroke)
            }
        };

        self.registry.persist_in_background(&session);
        let delivered = session.broadcast(
            &ServerMessage::Draw {
                id: admission.room_id.as_str().to_string(),
                username: admission.username.as_str().to_string(),
                figure,
            },
            Some(&admission.username),
        );
        tracing::debug!(
            "Applied draw from '{}' in room '{}' ({} stroke(s))",
            admission.username,
            admission.room_id,
            session.history.len()
        );
        drop(session);

        touch_room_in_background(self.room_repository.clone(), admission.room_id.clone(), now);
        Ok(delivered)
    }
}

/// Sanitize the free text of a text stroke; other kinds pass through.
fn sanitize_stroke(mut stroke: Stroke) -> Result<Stroke, DrawError> {
    if let Some(text) = stroke.text() {
        let sanitized = sanitize_text(text, STROKE_TEXT_MAX_CHARS);
        if sanitized.is_empty() {
            return Err(DrawError::EmptyText);
        }
        stroke.set_text(sanitized);
    }
    Ok(stroke)
}

//! UseCase: チャット送信
//!
//! サニタイズ → スパム判定 → チャットログへの追加 → 送信者以外へ配信。
//! 拒否されたメッセージは配信されず、理由は ui 層が送信者にだけ返します。

use std::sync::Arc;

use rakugaki_shared::{protocol::ServerMessage, time::Clock};

use crate::{
    config::CHAT_MESSAGE_MAX_CHARS,
    domain::{ChatEntry, RoomRepository, Timestamp, guard::sanitize_text},
    infrastructure::session::SessionRegistry,
};

use super::{Admission, error::ChatError, touch_room_in_background};

/// チャット送信のユースケース
pub struct SendChatUseCase {
    room_repository: Arc<dyn RoomRepository>,
    registry: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
}

impl SendChatUseCase {
    /// 新しい SendChatUseCase を作成
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

    /// チャット送信を実行
    ///
    /// # Returns
    ///
    /// * `Ok(ChatEntry)` - 受理されたメッセージ（サニタイズ済み）
    /// * `Err(ChatError)` - 拒否された
    pub async fn execute(
        &self,
        admission: &Admission,
        username: &str,
        message: &str,
    ) -> Result<ChatEntry, ChatError> {
        if !admission.is_claimed_by(username, None) {
            return Err(ChatError::IdentityMismatch);
        }
        let message = sanitize_text(message, CHAT_MESSAGE_MAX_CHARS);
        if message.is_empty() {
            return Err(ChatError::Empty);
        }

        let shared = self
            .registry
            .get(&admission.room_id)
            .await
            .ok_or(ChatError::NotMember)?;
        let mut session = shared.lock().await;
        if !session.is_member(&admission.username, admission.connection_id) {
            return Err(ChatError::NotMember);
        }

        let now = Timestamp::new(self.clock.now_millis());
        session.touch(&admission.username, now);
        session
            .spam_guard
            .check(admission.username.as_str(), &message, now.value())?;

        let entry = ChatEntry {
            username: admission.username.clone(),
            message,
            timestamp: now,
        };
        session.record_chat(entry.clone());
        session.broadcast(
            &ServerMessage::Chat {
                username: entry.username.as_str().to_string(),
                message: entry.message.clone(),
                timestamp: now.value(),
            },
            Some(&admission.username),
        );
        drop(session);

        touch_room_in_background(self.room_repository.clone(), admission.room_id.clone(), now);
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Visibility, guard::SpamReason},
        usecase::fixture::{TestEnv, drain},
    };

    fn usecase(env: &TestEnv) -> SendChatUseCase {
        SendChatUseCase::new(env.rooms.clone(), env.registry.clone(), env.clock.clone())
    }

    #[tokio::test]
    async fn test_chat_is_sanitized_and_broadcast() {
        // テスト項目: チャットはサニタイズされて送信者以外に配信され、ログに残る
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let (alice, mut alice_rx) = env.join(&room, "alice").await;
        let (_bob, mut bob_rx) = env.join(&room, "bob").await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        // when (操作):
        let entry = usecase(&env)
            .execute(&alice, "alice", "hello <i>there</i>")
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(entry.message, "hello there");
        assert!(drain(&mut alice_rx).is_empty());
        assert!(matches!(
            &drain(&mut bob_rx)[0],
            ServerMessage::Chat { username, message, .. }
                if username == "alice" && message == "hello there"
        ));
    }

    #[tokio::test]
    async fn test_repeating_characters_are_rejected_without_broadcast() {
        // テスト項目: 同じ文字が 15 回続くメッセージは拒否され、配信されない
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let (alice, _alice_rx) = env.join(&room, "alice").await;
        let (_bob, mut bob_rx) = env.join(&room, "bob").await;
        drain(&mut bob_rx);

        // when (操作):
        let result = usecase(&env).execute(&alice, "alice", &"A".repeat(15)).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ChatError::Spam(SpamReason::RepeatingCharacters))
        );
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn test_fourth_message_within_two_seconds_is_too_frequent() {
        // テスト項目: 2 秒以内の 4 通目は送信頻度超過で拒否される
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let (alice, _rx) = env.join(&room, "alice").await;
        let usecase = usecase(&env);
        for text in ["one", "two", "three"] {
            usecase.execute(&alice, "alice", text).await.unwrap();
            env.clock.advance(500);
        }

        // when (操作):
        let result = usecase.execute(&alice, "alice", "four").await;

        // then (期待する結果):
        assert_eq!(result, Err(ChatError::Spam(SpamReason::TooFrequent)));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        // テスト項目: サニタイズ後に空になるメッセージは拒否される
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let (alice, _rx) = env.join(&room, "alice").await;

        // when (操作):
        let result = usecase(&env).execute(&alice, "alice", "   ").await;

        // then (期待する結果):
        assert_eq!(result, Err(ChatError::Empty));
    }
}

//! UseCase: 参加者の入室（WebSocket ハンドシェイク）
//!
//! 1. ユーザー名をサニタイズし、REST で発行されたトークンと突き合わせる
//! 2. レジストリでルームの存在と現在の公開設定を再確認する
//! 3. ルームのセッションを開き（初回のみストロークをロード）、定員と
//!    ユーザー名の重複を検査して登録する
//! 4. 新規参加者へスナップショット（`draws`）を送ってから、他の参加者へ
//!    `connection` と全員へ `users` をブロードキャストする
//!
//! 4 の順序はセッションのロック内で行うため、スナップショットより先に
//! 差分が新規参加者に届くことはありません。

use std::sync::Arc;

use rakugaki_shared::{protocol::ServerMessage, time::Clock};
use uuid::Uuid;

use crate::{
    domain::{
        Participant, PusherChannel, RoomId, RoomRepository, Timestamp, Username,
        guard::sanitize_username,
    },
    infrastructure::{auth::JoinTokenIssuer, session::SessionRegistry},
};

use super::{error::ConnectError, touch_room_in_background};

/// 入室に成功した接続の識別情報
///
/// 以降のすべての操作で、メッセージが名乗る身元との照合に使われます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub room_id: RoomId,
    pub username: Username,
    pub connection_id: Uuid,
}

impl Admission {
    /// Whether a frame claiming `username` (and optionally `room_id`) was sent
    /// by this connection's verified identity.
    pub fn is_claimed_by(&self, username: &str, room_id: Option<&str>) -> bool {
        self.username.as_str() == username
            && room_id.is_none_or(|id| id == self.room_id.as_str())
    }
}

/// ハンドシェイクで受け取った入室要求
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub room_id: String,
    pub username: String,
    pub token: String,
}

/// 参加者入室のユースケース
pub struct ConnectParticipantUseCase {
    room_repository: Arc<dyn RoomRepository>,
    registry: Arc<SessionRegistry>,
    token_issuer: Arc<JoinTokenIssuer>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        room_repository: Arc<dyn RoomRepository>,
        registry: Arc<SessionRegistry>,
        token_issuer: Arc<JoinTokenIssuer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            room_repository,
            registry,
            token_issuer,
            clock,
        }
    }

    /// 入室を実行
    ///
    /// # Arguments
    ///
    /// * `request` - ハンドシェイクの内容（ルーム ID、ユーザー名、トークン）
    /// * `sender` - この接続の送信タスクへのチャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(Admission)` - 入室成功
    /// * `Err(ConnectError)` - 入室拒否（クローズコードに変換される）
    pub async fn execute(
        &self,
        request: ConnectRequest,
        sender: PusherChannel,
    ) -> Result<Admission, ConnectError> {
        // 1. トークンとハンドシェイクの照合
        let username = Username::new(sanitize_username(&request.username))
            .map_err(ConnectError::InvalidUsername)?;
        let claims = self.token_issuer.validate(&request.token)?;
        if claims.room_id != request.room_id || claims.username != username.as_str() {
            return Err(ConnectError::TokenMismatch);
        }
        let room_id = RoomId::new(request.room_id).map_err(|_| ConnectError::RoomNotFound)?;

        // 2. レジストリでの再確認
        let room = self
            .room_repository
            .find(&room_id)
            .await?
            .ok_or(ConnectError::RoomNotFound)?;
        if room.is_public() != claims.is_public {
            return Err(ConnectError::VisibilityChanged);
        }

        // 3. セッションへの登録
        let now = Timestamp::new(self.clock.now_millis());
        let connection_id = Uuid::new_v4();
        loop {
            let shared = self.registry.open(&room_id).await;
            let mut session = shared.lock().await;
            if session.is_closed() {
                // The last participant left between `open` and `lock`.
                continue;
            }

            let admitted = match self.registry.ensure_loaded(&mut session).await {
                Ok(()) => session
                    .admit(Participant::new(
                        connection_id,
                        username.clone(),
                        now,
                        sender.clone(),
                    ))
                    .map_err(ConnectError::from),
                Err(e) => Err(ConnectError::from(e)),
            };
            if let Err(e) = admitted {
                if session.is_empty() {
                    session.close();
                    self.registry.discard(&room_id, &shared).await;
                }
                return Err(e);
            }

            // 4. スナップショット → 参加通知 → メンバー一覧
            session.push_to(
                &username,
                &ServerMessage::Draws {
                    strokes: session.history.strokes().to_vec(),
                },
            );
            session.broadcast(
                &ServerMessage::Connection {
                    username: username.as_str().to_string(),
                },
                Some(&username),
            );
            session.broadcast(
                &ServerMessage::Users {
                    users: session.usernames(),
                },
                None,
            );

            tracing::info!(
                "'{}' joined room '{}' ({} participant(s))",
                username,
                room_id,
                session.participant_count()
            );
            break;
        }

        touch_room_in_background(self.room_repository.clone(), room_id.clone(), now);

        Ok(Admission {
            room_id,
            username,
            connection_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MockRoomRepository, RepositoryError, StrokeRepository, Visibility},
        usecase::fixture::{TestEnv, drain, line},
    };
    use rakugaki_shared::time::FixedClock;
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - トークン検証（改ざん・取り違え・公開設定の変更）
    // - 定員とユーザー名の重複チェック
    // - スナップショットが差分より先に届くこと
    // ========================================

    #[tokio::test]
    async fn test_connect_sends_snapshot_then_membership() {
        // テスト項目: 入室した参加者には既存ストロークのスナップショットが最初に届く
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        env.strokes
            .save(&room.id, 1, &[line("s1", "bob"), line("s2", "bob")])
            .await
            .unwrap();

        // when (操作):
        let (_admission, mut rx) = env.join(&room, "alice").await;

        // then (期待する結果):
        let messages = drain(&mut rx);
        assert!(matches!(&messages[0], ServerMessage::Draws { strokes } if strokes.len() == 2));
        assert_eq!(
            messages[1],
            ServerMessage::Users {
                users: vec!["alice".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn test_peers_are_notified_of_new_participant() {
        // テスト項目: 既存の参加者に connection と users が通知される
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let (_alice, mut alice_rx) = env.join(&room, "alice").await;
        drain(&mut alice_rx);

        // when (操作):
        let (_bob, _bob_rx) = env.join(&room, "bob").await;

        // then (期待する結果):
        let messages = drain(&mut alice_rx);
        assert_eq!(
            messages,
            vec![
                ServerMessage::Connection {
                    username: "bob".to_string()
                },
                ServerMessage::Users {
                    users: vec!["alice".to_string(), "bob".to_string()]
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        // テスト項目: 同じルームへの同名での再入室は拒否される（マージされない）
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let _alice = env.join(&room, "alice").await;

        // when (操作):
        let result = env.try_join(&room, "alice").await;

        // then (期待する結果):
        let error = result.unwrap_err();
        assert!(matches!(error, ConnectError::UsernameTaken(_)));
        assert_eq!(error.close_code(), 4009);
        assert_eq!(env.registry.participant_count(&room.id).await, 1);
    }

    #[tokio::test]
    async fn test_eleventh_participant_is_rejected() {
        // テスト項目: 10 人が入室済みのルームへの 11 人目は拒否される
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let mut connections = Vec::new();
        for i in 0..10 {
            connections.push(env.join(&room, &format!("user{}", i)).await);
        }

        // when (操作):
        let result = env.try_join(&room, "late").await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::RoomFull(10))));
        assert_eq!(env.registry.participant_count(&room.id).await, 10);
    }

    #[tokio::test]
    async fn test_token_for_other_room_is_rejected() {
        // テスト項目: 別のルーム用のトークンでは入室できない
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let other = env.create_room(Visibility::Public).await;
        let token = env.token(&other, "alice");
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = env
            .connect_usecase()
            .execute(
                ConnectRequest {
                    room_id: room.id.as_str().to_string(),
                    username: "alice".to_string(),
                    token,
                },
                tx,
            )
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::TokenMismatch)));
    }

    #[tokio::test]
    async fn test_token_for_other_username_is_rejected() {
        // テスト項目: 別のユーザー名用のトークンでは入室できない
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let token = env.token(&room, "bob");
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = env
            .connect_usecase()
            .execute(
                ConnectRequest {
                    room_id: room.id.as_str().to_string(),
                    username: "alice".to_string(),
                    token,
                },
                tx,
            )
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::TokenMismatch)));
    }

    #[tokio::test]
    async fn test_visibility_change_is_rejected() {
        // テスト項目: トークン発行後に公開設定が変わったルームには入室できない
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let token = env.token(&room, "alice");
        let mut private = room.clone();
        private.visibility = Visibility::Private;
        env.rooms.create(&private).await.unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = env
            .connect_usecase()
            .execute(
                ConnectRequest {
                    room_id: room.id.as_str().to_string(),
                    username: "alice".to_string(),
                    token,
                },
                tx,
            )
            .await;

        // then (期待する結果):
        let error = result.unwrap_err();
        assert!(matches!(error, ConnectError::VisibilityChanged));
        assert_eq!(error.close_code(), 1008);
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        // テスト項目: 期限切れのトークンでは入室できない
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let token = env.token(&room, "alice");
        env.clock.advance(2 * 60 * 60 * 1000);
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = env
            .connect_usecase()
            .execute(
                ConnectRequest {
                    room_id: room.id.as_str().to_string(),
                    username: "alice".to_string(),
                    token,
                },
                tx,
            )
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_deleted_room_is_not_found() {
        // テスト項目: 削除済みのルームへの入室は RoomNotFound になる
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        env.rooms.delete(&room.id).await.unwrap();

        // when (操作):
        let result = env.try_join(&room, "alice").await;

        // then (期待する結果):
        let error = result.unwrap_err();
        assert!(matches!(error, ConnectError::RoomNotFound));
        assert_eq!(error.close_code(), 4004);
    }

    #[tokio::test]
    async fn test_registry_failure_maps_to_internal_error() {
        // テスト項目: レジストリの読み出し失敗は内部エラーとして切断される
        // given (前提条件):
        let env = TestEnv::new();
        let room = env.create_room(Visibility::Public).await;
        let token = env.token(&room, "alice");
        let mut failing = MockRoomRepository::new();
        failing
            .expect_find()
            .returning(|_| Err(RepositoryError::Corrupted("broken".to_string())));
        let usecase = ConnectParticipantUseCase::new(
            Arc::new(failing),
            env.registry.clone(),
            env.issuer.clone(),
            Arc::new(FixedClock::new(0)),
        );
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = usecase
            .execute(
                ConnectRequest {
                    room_id: room.id.as_str().to_string(),
                    username: "alice".to_string(),
                    token,
                },
                tx,
            )
            .await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err().close_code(), 1011);
        assert_eq!(env.registry.active_count().await, 0);
    }

    #[test]
    fn test_admission_identity_check() {
        // テスト項目: メッセージの名乗る身元が接続の身元と一致するか判定できる
        // given (前提条件):
        let room_id = crate::domain::RoomIdFactory::generate();
        let admission = Admission {
            room_id: room_id.clone(),
            username: Username::new("alice".to_string()).unwrap(),
            connection_id: Uuid::new_v4(),
        };

        // when (操作):
        // then (期待する結果):
        assert!(admission.is_claimed_by("alice", None));
        assert!(admission.is_claimed_by("alice", Some(room_id.as_str())));
        assert!(!admission.is_claimed_by("bob", None));
        assert!(!admission.is_claimed_by("alice", Some("otherroom")));
    }
}

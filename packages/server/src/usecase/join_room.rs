//! UseCase: REST 経由の入室（トークン発行）
//!
//! ルームの存在と公開設定、非公開ルームではパスワードを確認したうえで、
//! `{roomId, username, isPublic}` を束縛した署名付きトークンを発行します。
//! WebSocket 側は同じサニタイズ済みユーザー名でトークンを照合します。

use std::sync::Arc;

use crate::{
    domain::{Room, RoomId, RoomRepository, Username, guard::sanitize_username},
    infrastructure::auth::{JoinTokenIssuer, RoomPasswordHasher},
};

use super::error::JoinRoomError;

/// 発行されたトークンと、トークンに束縛されたユーザー名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGrant {
    pub token: String,
    /// Sanitized form of the requested username
    pub username: String,
}

/// 入室トークン発行のユースケース
pub struct JoinRoomUseCase {
    room_repository: Arc<dyn RoomRepository>,
    password_hasher: Arc<RoomPasswordHasher>,
    token_issuer: Arc<JoinTokenIssuer>,
}

impl JoinRoomUseCase {
    pub fn new(
        room_repository: Arc<dyn RoomRepository>,
        password_hasher: Arc<RoomPasswordHasher>,
        token_issuer: Arc<JoinTokenIssuer>,
    ) -> Self {
        Self {
            room_repository,
            password_hasher,
            token_issuer,
        }
    }

    /// 公開ルームへの入室
    pub async fn join_public(&self, room_id: &str, username: &str) -> Result<JoinGrant, JoinRoomError> {
        let room = self.find_room(room_id).await?;
        if !room.is_public() {
            return Err(JoinRoomError::RoomIsPrivate);
        }
        self.grant(&room, username)
    }

    /// 非公開ルームへの入室。パスワードのあるルームでは一致が必須です。
    pub async fn join_private(
        &self,
        room_id: &str,
        username: &str,
        password: Option<&str>,
    ) -> Result<JoinGrant, JoinRoomError> {
        let room = self.find_room(room_id).await?;
        if room.is_public() {
            return Err(JoinRoomError::RoomIsPublic);
        }
        if let Some(hash) = room.password_hash() {
            let presented = password.unwrap_or_default();
            if !self.password_hasher.verify(presented, hash) {
                tracing::warn!("Rejected join of room '{}': wrong password", room.id);
                return Err(JoinRoomError::InvalidPassword);
            }
        }
        self.grant(&room, username)
    }

    async fn find_room(&self, room_id: &str) -> Result<Room, JoinRoomError> {
        let id = RoomId::new(room_id.to_string()).map_err(|_| JoinRoomError::RoomNotFound)?;
        self.room_repository
            .find(&id)
            .await?
            .ok_or(JoinRoomError::RoomNotFound)
    }

    fn grant(&self, room: &Room, username: &str) -> Result<JoinGrant, JoinRoomError> {
        let username =
            Username::new(sanitize_username(username)).map_err(JoinRoomError::InvalidUsername)?;
        let token = self.token_issuer.issue(&room.id, &username, room.visibility)?;
        tracing::info!("Issued join token for '{}' in room '{}'", username, room.id);
        Ok(JoinGrant {
            token,
            username: username.into_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{RoomIdFactory, RoomName, Timestamp, Visibility},
        infrastructure::repository::InMemoryRoomRepository,
    };
    use rakugaki_shared::time::FixedClock;
    use std::time::Duration;

    struct Setup {
        usecase: JoinRoomUseCase,
        issuer: Arc<JoinTokenIssuer>,
        public: Room,
        private: Room,
    }

    async fn setup() -> Setup {
        let hasher = Arc::new(RoomPasswordHasher::new());
        let repository = Arc::new(InMemoryRoomRepository::new());
        let issuer = Arc::new(JoinTokenIssuer::new(
            "test-secret",
            Duration::from_secs(3600),
            Arc::new(FixedClock::new(1_700_000_000_000)),
        ));
        let public = Room::new(
            RoomIdFactory::generate(),
            RoomName::new("Lobby".to_string()).unwrap(),
            Visibility::Public,
            None,
            Timestamp::new(0),
        );
        let private = Room::new(
            RoomIdFactory::generate(),
            RoomName::new("Art".to_string()).unwrap(),
            Visibility::Private,
            Some(hasher.hash("secret123").unwrap()),
            Timestamp::new(0),
        );
        repository.create(&public).await.unwrap();
        repository.create(&private).await.unwrap();
        Setup {
            usecase: JoinRoomUseCase::new(repository, hasher, issuer.clone()),
            issuer,
            public,
            private,
        }
    }

    #[tokio::test]
    async fn test_join_private_with_correct_password() {
        // テスト項目: 正しいパスワードで非公開ルーム用のトークンが発行される
        // given (前提条件):
        let setup = setup().await;

        // when (操作):
        let grant = setup
            .usecase
            .join_private(setup.private.id.as_str(), "alice", Some("secret123"))
            .await
            .unwrap();

        // then (期待する結果):
        let claims = setup.issuer.validate(&grant.token).unwrap();
        assert_eq!(claims.room_id, setup.private.id.as_str());
        assert_eq!(claims.username, "alice");
        assert!(!claims.is_public);
    }

    #[tokio::test]
    async fn test_join_private_with_wrong_password() {
        // テスト項目: 誤ったパスワードでは InvalidPassword になる
        // given (前提条件):
        let setup = setup().await;

        // when (操作):
        let result = setup
            .usecase
            .join_private(setup.private.id.as_str(), "alice", Some("wrong"))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(JoinRoomError::InvalidPassword)));
    }

    #[tokio::test]
    async fn test_public_path_refuses_private_room() {
        // テスト項目: 公開ルーム用の経路では非公開ルームに入れない
        // given (前提条件):
        let setup = setup().await;

        // when (操作):
        let result = setup
            .usecase
            .join_public(setup.private.id.as_str(), "alice")
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(JoinRoomError::RoomIsPrivate)));
    }

    #[tokio::test]
    async fn test_join_public_binds_sanitized_username() {
        // テスト項目: トークンにはサニタイズ後のユーザー名が束縛される
        // given (前提条件):
        let setup = setup().await;

        // when (操作):
        let grant = setup
            .usecase
            .join_public(setup.public.id.as_str(), "  <b>bob</b> ")
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(grant.username, "bob");
        let claims = setup.issuer.validate(&grant.token).unwrap();
        assert_eq!(claims.username, "bob");
        assert!(claims.is_public);
    }

    #[tokio::test]
    async fn test_unknown_room_is_not_found() {
        // テスト項目: 存在しないルームへの入室は RoomNotFound になる
        // given (前提条件):
        let setup = setup().await;

        // when (操作):
        let result = setup.usecase.join_public("AAAAAAAAA", "alice").await;

        // then (期待する結果):
        assert!(matches!(result, Err(JoinRoomError::RoomNotFound)));
    }

    #[tokio::test]
    async fn test_username_sanitized_to_empty_is_rejected() {
        // テスト項目: サニタイズ後に空になるユーザー名は拒否される
        // given (前提条件):
        let setup = setup().await;

        // when (操作):
        let result = setup
            .usecase
            .join_public(setup.public.id.as_str(), "<script>x</script>")
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(JoinRoomError::InvalidUsername(_))));
    }
}

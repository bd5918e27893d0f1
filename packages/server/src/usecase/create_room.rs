//! UseCase: ルーム作成
//!
//! ルーム名をサニタイズし、非公開かつパスワード指定ありの場合だけ
//! パスワードハッシュを保存します。レジストリへの書き込みが完了してから
//! ルーム ID を返します。

use std::sync::Arc;

use rakugaki_shared::time::Clock;

use crate::{
    domain::{
        Room, RoomId, RoomIdFactory, RoomName, RoomRepository, Timestamp, Visibility,
        guard::sanitize_room_name,
    },
    infrastructure::auth::RoomPasswordHasher,
};

use super::error::CreateRoomError;

/// Attempts at finding an unused id before giving up.
const MAX_ID_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct CreateRoomRequest {
    pub name: String,
    pub is_public: bool,
    pub password: Option<String>,
}

/// ルーム作成のユースケース
pub struct CreateRoomUseCase {
    room_repository: Arc<dyn RoomRepository>,
    password_hasher: Arc<RoomPasswordHasher>,
    clock: Arc<dyn Clock>,
}

impl CreateRoomUseCase {
    /// 新しい CreateRoomUseCase を作成
    pub fn new(
        room_repository: Arc<dyn RoomRepository>,
        password_hasher: Arc<RoomPasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            room_repository,
            password_hasher,
            clock,
        }
    }

    /// ルーム作成を実行
    ///
    /// # Returns
    ///
    /// * `Ok(RoomId)` - 作成されたルームの ID
    /// * `Err(CreateRoomError)` - 名前が空、またはレジストリへの書き込み失敗
    pub async fn execute(&self, request: CreateRoomRequest) -> Result<RoomId, CreateRoomError> {
        let name = sanitize_room_name(&request.name);
        if name.is_empty() {
            return Err(CreateRoomError::EmptyName);
        }
        let name = RoomName::new(name)?;

        let visibility = Visibility::from_is_public(request.is_public);
        let password_hash = match (visibility, request.password.as_deref()) {
            (Visibility::Private, Some(password)) if !password.is_empty() => {
                Some(self.password_hasher.hash(password)?)
            }
            _ => None,
        };

        let id = self.allocate_id().await?;
        let room = Room::new(
            id.clone(),
            name,
            visibility,
            password_hash,
            Timestamp::new(self.clock.now_millis()),
        );
        self.room_repository.create(&room).await?;

        tracing::info!(
            "Created {} room '{}' ({}, password: {})",
            if room.is_public() { "public" } else { "private" },
            room.name.as_str(),
            id,
            room.has_password()
        );
        Ok(id)
    }

    async fn allocate_id(&self) -> Result<RoomId, CreateRoomError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = RoomIdFactory::generate();
            if self.room_repository.find(&id).await?.is_none() {
                return Ok(id);
            }
            tracing::debug!("Room id '{}' already in use; regenerating", id);
        }
        Err(CreateRoomError::IdExhausted)
    }
}

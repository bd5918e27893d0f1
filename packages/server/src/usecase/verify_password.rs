//! UseCase: ルームのパスワード確認

use std::sync::Arc;

use crate::{
    domain::{RoomId, RoomRepository},
    infrastructure::auth::RoomPasswordHasher,
};

use super::error::VerifyPasswordError;

/// パスワード確認のユースケース
pub struct VerifyPasswordUseCase {
    room_repository: Arc<dyn RoomRepository>,
    password_hasher: Arc<RoomPasswordHasher>,
}

impl VerifyPasswordUseCase {
    pub fn new(
        room_repository: Arc<dyn RoomRepository>,
        password_hasher: Arc<RoomPasswordHasher>,
    ) -> Self {
        Self {
            room_repository,
            password_hasher,
        }
    }

    /// パスワードが一致するかを返します。パスワードのないルームは常に一致します。
    pub async fn execute(&self, room_id: &str, password: &str) -> Result<bool, VerifyPasswordError> {
        let id = RoomId::new(room_id.to_string()).map_err(|_| VerifyPasswordError::RoomNotFound)?;
        let room = self
            .room_repository
            .find(&id)
            .await?
            .ok_or(VerifyPasswordError::RoomNotFound)?;
        Ok(match room.password_hash() {
            Some(hash) => self.password_hasher.verify(password, hash),
            None => true,
        })
    }
}

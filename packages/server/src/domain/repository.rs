//! Repository trait 定義
//!
//! ドメイン層が必要とする永続化のインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! - `RoomRepository`: ルームのメタデータ（レジストリ）
//! - `StrokeRepository`: ルームごとのストロークリスト（全体を毎回書き換える）

use async_trait::async_trait;
use rakugaki_shared::stroke::Stroke;

#[cfg(test)]
use mockall::automock;

use super::{Room, RoomId, RepositoryError, Timestamp};

/// Durable registry of room metadata.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Persist a new room. Completes only once the record is durable.
    async fn create(&self, room: &Room) -> Result<(), RepositoryError>;

    async fn find(&self, id: &RoomId) -> Result<Option<Room>, RepositoryError>;

    /// Move `last_activity_at` forward to `at`.
    async fn touch(&self, id: &RoomId, at: Timestamp) -> Result<(), RepositoryError>;

    async fn list(&self) -> Result<Vec<Room>, RepositoryError>;

    /// Delete a room record. Deleting an unknown room is not an error.
    async fn delete(&self, id: &RoomId) -> Result<(), RepositoryError>;
}

/// Durable, whole-list stroke storage, one record per room.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StrokeRepository: Send + Sync {
    /// Load the stroke list of a room; an unknown room has an empty list.
    async fn load(&self, id: &RoomId) -> Result<Vec<Stroke>, RepositoryError>;

    /// Replace the stored list of a room.
    ///
    /// `revision` orders writes of the same room: a write whose revision is
    /// lower than the last one stored is skipped. Returns whether the list was
    /// written.
    async fn save(
        &self,
        id: &RoomId,
        revision: u64,
        strokes: &[Stroke],
    ) -> Result<bool, RepositoryError>;

    async fn delete(&self, id: &RoomId) -> Result<(), RepositoryError>;
}

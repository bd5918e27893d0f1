//! UseCase 層
//!
//! 各ユースケースは 1 つの操作を表す構造体で、依存はコンストラクタで
//! 受け取ります。ルームの状態を変える操作はすべてセッションのロック内で
//! 行われ、ルーム単位で直列化されます。

pub mod clear_canvas;
pub mod connect_participant;
pub mod create_room;
pub mod disconnect_participant;
pub mod draw;
pub mod error;
pub mod get_room;
pub mod get_session_state;
pub mod join_room;
pub mod list_rooms;
pub mod send_chat;
pub mod sweep;
pub mod verify_password;

pub use clear_canvas::ClearCanvasUseCase;
pub use connect_participant::{Admission, ConnectParticipantUseCase, ConnectRequest};
pub use create_room::{CreateRoomRequest, CreateRoomUseCase};
pub use disconnect_participant::{DisconnectOutcome, DisconnectParticipantUseCase};
pub use draw::DrawUseCase;
pub use error::{
    ChatError, ConnectError, CreateRoomError, DrawError, JoinRoomError, VerifyPasswordError,
};
pub use get_room::GetRoomUseCase;
pub use get_session_state::{GetSessionStateUseCase, SessionState};
pub use join_room::{JoinGrant, JoinRoomUseCase};
pub use list_rooms::{ListRoomsUseCase, RoomSummary};
pub use send_chat::SendChatUseCase;
pub use sweep::SweepUseCase;
pub use verify_password::VerifyPasswordUseCase;

use std::sync::Arc;

use crate::domain::{RoomId, RoomRepository, Timestamp};

/// Move the room's `last_activity_at` forward without waiting for the write.
pub(crate) fn touch_room_in_background(
    repository: Arc<dyn RoomRepository>,
    room_id: RoomId,
    at: Timestamp,
) {
    tokio::spawn(async move {
        if let Err(e) = repository.touch(&room_id, at).await {
            tracing::warn!("Failed to record activity of room '{}': {}", room_id, e);
        }
    });
}

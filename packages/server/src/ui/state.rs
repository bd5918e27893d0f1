//! Server state shared by every handler.

use std::{sync::Arc, time::Duration};

use crate::usecase::{
    ClearCanvasUseCase, ConnectParticipantUseCase, CreateRoomUseCase, DisconnectParticipantUseCase,
    DrawUseCase, GetRoomUseCase, GetSessionStateUseCase, JoinRoomUseCase, ListRoomsUseCase,
    SendChatUseCase, SweepUseCase, VerifyPasswordUseCase,
};

/// Shared application state
pub struct AppState {
    /// CreateRoomUseCase（ルーム作成のユースケース）
    pub create_room_usecase: Arc<CreateRoomUseCase>,
    /// GetRoomUseCase（ルーム情報取得のユースケース）
    pub get_room_usecase: Arc<GetRoomUseCase>,
    /// ListRoomsUseCase（公開ルーム一覧のユースケース）
    pub list_rooms_usecase: Arc<ListRoomsUseCase>,
    /// VerifyPasswordUseCase（パスワード確認のユースケース）
    pub verify_password_usecase: Arc<VerifyPasswordUseCase>,
    /// JoinRoomUseCase（入室トークン発行のユースケース）
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// ConnectParticipantUseCase（WebSocket 入室のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（退室のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// DrawUseCase（描画・undo・redo のユースケース）
    pub draw_usecase: Arc<DrawUseCase>,
    /// ClearCanvasUseCase（全消去のユースケース）
    pub clear_canvas_usecase: Arc<ClearCanvasUseCase>,
    /// SendChatUseCase（チャット送信のユースケース）
    pub send_chat_usecase: Arc<SendChatUseCase>,
    /// GetSessionStateUseCase（デバッグ用のセッション状態取得）
    pub get_session_state_usecase: Arc<GetSessionStateUseCase>,
    /// SweepUseCase（アイドル切断・保持期限切れ削除・シャットダウン時の書き出し）
    pub sweep_usecase: Arc<SweepUseCase>,
    /// Per-connection limits applied by the WebSocket handler
    pub connection_limits: ConnectionLimits,
}

/// Limits enforced on every WebSocket connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    pub handshake_timeout: Duration,
    pub rate_limit_window: Duration,
    pub rate_limit_max_messages: usize,
}

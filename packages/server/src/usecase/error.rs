//! UseCase 層のエラー定義
//!
//! HTTP 系のエラーは ui 層でステータスコードに、WebSocket 系のエラーは
//! クローズコードに変換されます。

use rakugaki_shared::protocol::close_code;
use thiserror::Error;

use crate::{
    domain::{AdmissionError, HistoryError, RepositoryError, ValueObjectError, guard::SpamReason},
    infrastructure::auth::{PasswordError, TokenError},
};

/// ルーム作成のエラー
#[derive(Debug, Error)]
pub enum CreateRoomError {
    #[error("Room name must not be empty")]
    EmptyName,

    #[error(transparent)]
    InvalidName(#[from] ValueObjectError),

    #[error(transparent)]
    PasswordHash(#[from] PasswordError),

    #[error("Could not allocate a free room id")]
    IdExhausted,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// パスワード確認のエラー
#[derive(Debug, Error)]
pub enum VerifyPasswordError {
    #[error("Room not found")]
    RoomNotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// REST 経由の入室（トークン発行）のエラー
#[derive(Debug, Error)]
pub enum JoinRoomError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Invalid username: {0}")]
    InvalidUsername(ValueObjectError),

    /// 公開ルーム用の経路で非公開ルームに入ろうとした
    #[error("Room is private; use the private join")]
    RoomIsPrivate,

    /// 非公開ルーム用の経路で公開ルームに入ろうとした
    #[error("Room is public; use the public join")]
    RoomIsPublic,

    #[error("Invalid password")]
    InvalidPassword,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// WebSocket ハンドシェイク（入室）のエラー
///
/// すべてのバリアントがクローズコードに 1:1 で対応します。
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Invalid username: {0}")]
    InvalidUsername(ValueObjectError),

    #[error("Invalid join token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("Join token does not match this room or username")]
    TokenMismatch,

    #[error("Room visibility no longer matches the join token")]
    VisibilityChanged,

    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full ({0} participants)")]
    RoomFull(usize),

    #[error("Username '{0}' is already taken in this room")]
    UsernameTaken(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ConnectError {
    pub fn close_code(&self) -> u16 {
        match self {
            ConnectError::InvalidUsername(_)
            | ConnectError::InvalidToken(_)
            | ConnectError::TokenMismatch
            | ConnectError::VisibilityChanged => close_code::POLICY_VIOLATION,
            ConnectError::RoomNotFound => close_code::ROOM_NOT_FOUND,
            ConnectError::RoomFull(_) => close_code::ROOM_FULL,
            ConnectError::UsernameTaken(_) => close_code::USERNAME_TAKEN,
            ConnectError::Repository(_) => close_code::INTERNAL_ERROR,
        }
    }
}

impl From<AdmissionError> for ConnectError {
    fn from(error: AdmissionError) -> Self {
        match error {
            AdmissionError::RoomFull(capacity) => ConnectError::RoomFull(capacity),
            AdmissionError::UsernameTaken(name) => ConnectError::UsernameTaken(name),
        }
    }
}

/// 描画系操作（draw / undo / redo / clear）のエラー
///
/// `Rejected` は認可エラーで、送信者にも通知せずに無視されます。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("Message identity does not match the connection")]
    IdentityMismatch,

    #[error("Connection is not a member of the room")]
    NotMember,

    #[error("Text is empty after sanitization")]
    EmptyText,

    #[error(transparent)]
    Rejected(#[from] HistoryError),
}

/// チャット送信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("Message identity does not match the connection")]
    IdentityMismatch,

    #[error("Connection is not a member of the room")]
    NotMember,

    #[error("Message is empty")]
    Empty,

    #[error(transparent)]
    Spam(#[from] SpamReason),
}

//! Error types for the Rakugaki client.

use rakugaki_shared::protocol::close_code;
use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server refused the admission and closed the socket
    #[error("Rejected by server ({code}): {reason}")]
    Rejected { code: u16, reason: String },

    /// Could not open the WebSocket connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The connection dropped after the room was joined
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// The HTTP API answered with an error status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether retrying the same join can never succeed.
    pub fn is_permanent(&self) -> bool {
        match self {
            ClientError::Rejected { code, .. } => matches!(
                *code,
                close_code::POLICY_VIOLATION
                    | close_code::ROOM_FULL
                    | close_code::ROOM_NOT_FOUND
                    | close_code::USERNAME_TAKEN
            ),
            ClientError::Api { status, .. } => matches!(*status, 400 | 401 | 404),
            ClientError::ConnectionError(_)
            | ClientError::Disconnected(_)
            | ClientError::Http(_)
            | ClientError::Encode(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_rejections_are_permanent() {
        // テスト項目: 入室拒否のクローズコードは再接続しても成功しない扱いになる
        // given (前提条件):
        let codes = [
            close_code::POLICY_VIOLATION,
            close_code::ROOM_FULL,
            close_code::ROOM_NOT_FOUND,
            close_code::USERNAME_TAKEN,
        ];

        // when (操作):
        // then (期待する結果):
        for code in codes {
            let error = ClientError::Rejected {
                code,
                reason: String::new(),
            };
            assert!(error.is_permanent(), "code {} should be permanent", code);
        }
    }

    #[test]
    fn test_transient_failures_are_retried() {
        // テスト項目: アイドル切断や通信断は再接続の対象になる
        // given (前提条件):
        let idle = ClientError::Rejected {
            code: close_code::IDLE_TIMEOUT,
            reason: "Idle timeout".to_string(),
        };
        let going_away = ClientError::Rejected {
            code: close_code::GOING_AWAY,
            reason: "Server shutting down".to_string(),
        };
        let dropped = ClientError::Disconnected("Connection lost".to_string());
        let server_error = ClientError::Api {
            status: 500,
            message: "Internal server error".to_string(),
        };

        // when (操作):
        // then (期待する結果):
        assert!(!idle.is_permanent());
        assert!(!going_away.is_permanent());
        assert!(!dropped.is_permanent());
        assert!(!server_error.is_permanent());
    }
}

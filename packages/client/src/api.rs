//! HTTP API client: room creation, lookup and join.

use rakugaki_shared::http::{
    CreateRoomRequest, CreateRoomResponse, ErrorResponse, JoinRoomRequest, JoinRoomResponse,
    RoomInfoResponse,
};
use reqwest::{Response, StatusCode};

use crate::error::ClientError;

pub struct RoomApi {
    http: reqwest::Client,
    base_url: String,
}

impl RoomApi {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// WebSocket endpoint on the same host.
    pub fn websocket_url(&self) -> String {
        let rest = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            format!("ws://{}", self.base_url)
        };
        format!("{}/ws", rest)
    }

    pub async fn create_room(
        &self,
        name: &str,
        is_public: bool,
        password: Option<&str>,
    ) -> Result<String, ClientError> {
        let request = CreateRoomRequest {
            name: name.to_string(),
            is_public,
            password: password.map(str::to_string),
        };
        let response = self
            .http
            .post(format!("{}/api/rooms", self.base_url))
            .json(&request)
            .send()
            .await?;
        let created: CreateRoomResponse = check(response).await?.json().await?;
        Ok(created.room_id)
    }

    pub async fn room_info(&self, room_id: &str) -> Result<RoomInfoResponse, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/rooms/{}", self.base_url, room_id))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Request a join token, using the private flow when the room is private.
    pub async fn join(
        &self,
        room_id: &str,
        username: &str,
        password: Option<&str>,
    ) -> Result<JoinRoomResponse, ClientError> {
        let info = self.room_info(room_id).await?;
        if !info.exists {
            return Err(ClientError::Api {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: format!("Room '{}' does not exist", room_id),
            });
        }

        let path = if info.is_public.unwrap_or(true) {
            "join-public"
        } else {
            "join-private"
        };
        let request = JoinRoomRequest {
            username: username.to_string(),
            password: password.map(str::to_string),
        };
        let response = self
            .http
            .post(format!("{}/api/rooms/{}/{}", self.base_url, room_id, path))
            .json(&request)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}

/// Turn a non-success status into `ClientError::Api`, keeping the server's message.
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("Unknown error").to_string(),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_url_follows_scheme() {
        // テスト項目: サーバー URL のスキームに合わせて WebSocket URL が組み立てられる
        // given (前提条件):
        let plain = RoomApi::new("http://127.0.0.1:8080/");
        let secure = RoomApi::new("https://draw.example.com");

        // when (操作):
        let plain_url = plain.websocket_url();
        let secure_url = secure.websocket_url();

        // then (期待する結果):
        assert_eq!(plain_url, "ws://127.0.0.1:8080/ws");
        assert_eq!(secure_url, "wss://draw.example.com/ws");
    }
}

//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rakugaki_shared::{
    http::{
        ChatEntryDto, CreateRoomRequest, CreateRoomResponse, ErrorResponse, JoinRoomRequest,
        JoinRoomResponse, RoomInfoResponse, RoomSummaryDto, SessionStateDto,
        VerifyPasswordRequest, VerifyPasswordResponse,
    },
    time::timestamp_to_rfc3339,
};

use crate::{
    domain::RepositoryError,
    ui::state::AppState,
    usecase::{self, CreateRoomError, JoinRoomError, VerifyPasswordError},
};

/// Error response with a JSON body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        tracing::error!("Request failed: {}", error);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        ApiError::internal(error)
    }
}

impl From<CreateRoomError> for ApiError {
    fn from(error: CreateRoomError) -> Self {
        if matches!(
            error,
            CreateRoomError::EmptyName | CreateRoomError::InvalidName(_)
        ) {
            ApiError::new(StatusCode::BAD_REQUEST, error.to_string())
        } else {
            ApiError::internal(error)
        }
    }
}

impl From<JoinRoomError> for ApiError {
    fn from(error: JoinRoomError) -> Self {
        let status = match &error {
            JoinRoomError::RoomNotFound => StatusCode::NOT_FOUND,
            JoinRoomError::InvalidUsername(_)
            | JoinRoomError::RoomIsPrivate
            | JoinRoomError::RoomIsPublic => StatusCode::BAD_REQUEST,
            JoinRoomError::InvalidPassword => StatusCode::UNAUTHORIZED,
            JoinRoomError::Token(_) | JoinRoomError::Repository(_) => {
                return ApiError::internal(error);
            }
        };
        ApiError::new(status, error.to_string())
    }
}

impl From<VerifyPasswordError> for ApiError {
    fn from(error: VerifyPasswordError) -> Self {
        match error {
            VerifyPasswordError::RoomNotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "Room not found")
            }
            VerifyPasswordError::Repository(e) => ApiError::internal(e),
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Create a room
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<CreateRoomResponse>), ApiError> {
    let room_id = state
        .create_room_usecase
        .execute(usecase::CreateRoomRequest {
            name: body.name,
            is_public: body.is_public,
            password: body.password,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateRoomResponse {
            room_id: room_id.into_string(),
        }),
    ))
}

/// Room existence and metadata
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomInfoResponse>, ApiError> {
    let room = state.get_room_usecase.execute(&room_id).await?;

    // Domain Model から DTO への変換
    let info = match room {
        Some(room) => RoomInfoResponse {
            exists: true,
            name: Some(room.name.as_str().to_string()),
            is_public: Some(room.is_public()),
            has_password: Some(room.has_password()),
        },
        None => RoomInfoResponse {
            exists: false,
            name: None,
            is_public: None,
            has_password: None,
        },
    };
    Ok(Json(info))
}

/// List public rooms
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RoomSummaryDto>>, ApiError> {
    let summaries = state.list_rooms_usecase.execute().await?;

    // Domain Model から DTO への変換
    let rooms = summaries
        .into_iter()
        .map(|summary| RoomSummaryDto {
            id: summary.room.id.as_str().to_string(),
            name: summary.room.name.as_str().to_string(),
            active_users: summary.active_users,
            created_at: timestamp_to_rfc3339(summary.room.created_at.value()),
            last_activity_at: timestamp_to_rfc3339(summary.room.last_activity_at.value()),
        })
        .collect();
    Ok(Json(rooms))
}

/// Check a room password
pub async fn verify_password(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(body): Json<VerifyPasswordRequest>,
) -> Result<Json<VerifyPasswordResponse>, ApiError> {
    let valid = state
        .verify_password_usecase
        .execute(&room_id, &body.password)
        .await?;
    Ok(Json(VerifyPasswordResponse { valid }))
}

/// Obtain a join token for a public room
pub async fn join_public(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(body): Json<JoinRoomRequest>,
) -> Result<Json<JoinRoomResponse>, ApiError> {
    let grant = state
        .join_room_usecase
        .join_public(&room_id, &body.username)
        .await?;
    Ok(Json(JoinRoomResponse {
        token: grant.token,
        username: grant.username,
    }))
}

/// Obtain a join token for a private room
pub async fn join_private(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(body): Json<JoinRoomRequest>,
) -> Result<Json<JoinRoomResponse>, ApiError> {
    let grant = state
        .join_room_usecase
        .join_private(&room_id, &body.username, body.password.as_deref())
        .await?;
    Ok(Json(JoinRoomResponse {
        token: grant.token,
        username: grant.username,
    }))
}

/// Debug endpoint returning the live state of an active room
pub async fn debug_session_state(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<SessionStateDto>, ApiError> {
    let session = state
        .get_session_state_usecase
        .execute(&room_id)
        .await
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Room is not active"))?;

    Ok(Json(SessionStateDto {
        room_id: session.room_id.into_string(),
        users: session.users,
        stroke_count: session.stroke_count,
        chat: session
            .chat
            .into_iter()
            .map(|entry| ChatEntryDto {
                username: entry.username.into_string(),
                message: entry.message,
                timestamp: entry.timestamp.value(),
            })
            .collect(),
    }))
}

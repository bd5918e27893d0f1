//! HTTP and WebSocket handlers.

mod http;
mod websocket;

pub use http::{
    create_room, debug_session_state, get_room, health_check, join_private,
    join_public, list_rooms, verify_password,
};
pub use websocket::websocket_handler;

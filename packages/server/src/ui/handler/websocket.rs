//! WebSocket connection handlers.
//!
//! One socket goes through three phases:
//!
//! 1. handshake: the first frame must be a `connection` message, received
//!    within the handshake timeout
//! 2. session: a writer task drains the connection's outbound channel while
//!    the reader dispatches incoming frames, under a per-connection rate limit
//! 3. leave: however the socket ended, the participant leaves the room

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use rakugaki_shared::protocol::{ClientMessage, ServerMessage, close_code};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    domain::{Outbound, PusherChannel, guard::RateLimiter},
    ui::state::AppState,
    usecase::{Admission, ChatError, ConnectRequest, DrawError},
};

/// Time the writer gets to deliver a close frame requested by the reader.
const CLOSE_GRACE: std::time::Duration = std::time::Duration::from_secs(1);
/// Largest close reason that fits a control frame next to the 2-byte code.
const MAX_CLOSE_REASON_BYTES: usize = 123;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// How the reader loop ended.
enum ReadEnd {
    /// The peer closed or the transport failed
    Closed,
    /// A close frame was queued for the writer
    Closing,
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let limits = state.connection_limits;

    // 1. ハンドシェイク
    let request =
        match tokio::time::timeout(limits.handshake_timeout, read_handshake(&mut receiver)).await
        {
            Ok(Some(request)) => request,
            Ok(None) => {
                tracing::warn!("Rejecting socket: missing or malformed connection message");
                close_socket(
                    &mut sender,
                    close_code::POLICY_VIOLATION,
                    "Expected a connection message",
                )
                .await;
                return;
            }
            Err(_) => {
                tracing::warn!("Rejecting socket: handshake timed out");
                close_socket(&mut sender, close_code::POLICY_VIOLATION, "Handshake timed out")
                    .await;
                return;
            }
        };

    let (tx, rx) = mpsc::unbounded_channel();
    let admission = match state
        .connect_participant_usecase
        .execute(request, tx.clone())
        .await
    {
        Ok(admission) => admission,
        Err(e) => {
            tracing::warn!("Rejected admission: {}", e);
            close_socket(&mut sender, e.close_code(), &e.to_string()).await;
            return;
        }
    };

    // 2. セッション
    let mut send_task = pusher_loop(rx, sender);
    let mut recv_task = {
        let state = state.clone();
        let admission = admission.clone();
        tokio::spawn(async move { read_loop(receiver, state, admission, tx).await })
    };

    tokio::select! {
        end = &mut recv_task => {
            if matches!(end, Ok(ReadEnd::Closing)) {
                if tokio::time::timeout(CLOSE_GRACE, &mut send_task).await.is_err() {
                    send_task.abort();
                }
            } else {
                send_task.abort();
            }
        }
        _ = &mut send_task => recv_task.abort(),
    }

    // 3. 退室
    let outcome = state
        .disconnect_participant_usecase
        .execute(&admission)
        .await;
    tracing::debug!(
        "Connection of '{}' in room '{}' ended: {:?}",
        admission.username,
        admission.room_id,
        outcome
    );
}

/// Wait for the `connection` frame. Any other first frame is a policy violation.
async fn read_handshake(receiver: &mut SplitStream<WebSocket>) -> Option<ConnectRequest> {
    while let Some(msg) = receiver.next().await {
        match msg.ok()? {
            Message::Text(text) => {
                return match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Connection {
                        id,
                        username,
                        token,
                    }) => Some(ConnectRequest {
                        room_id: id,
                        username,
                        token,
                    }),
                    _ => None,
                };
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            _ => return None,
        }
    }
    None
}

/// Spawns a task that drains the outbound channel into the WebSocket sink.
///
/// A `Close` item sends a close frame and ends the task.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    mut sender: SplitSink<WebSocket, Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Text(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close { code, reason } => {
                    close_socket(&mut sender, code, &reason).await;
                    break;
                }
            }
        }
    })
}

async fn read_loop(
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
    admission: Admission,
    tx: PusherChannel,
) -> ReadEnd {
    let limits = state.connection_limits;
    let mut limiter = RateLimiter::new(limits.rate_limit_window, limits.rate_limit_max_messages);

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!("WebSocket error from '{}': {}", admission.username, e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                if !limiter.check(Instant::now()) {
                    tracing::warn!(
                        "'{}' exceeded the rate limit in room '{}'",
                        admission.username,
                        admission.room_id
                    );
                    let _ = tx.send(Outbound::Close {
                        code: close_code::POLICY_VIOLATION,
                        reason: "Rate limit exceeded".to_string(),
                    });
                    return ReadEnd::Closing;
                }
                dispatch(&state, &admission, &tx, &text).await;
            }
            Message::Binary(_) => {
                if !limiter.check(Instant::now()) {
                    let _ = tx.send(Outbound::Close {
                        code: close_code::POLICY_VIOLATION,
                        reason: "Rate limit exceeded".to_string(),
                    });
                    return ReadEnd::Closing;
                }
                tracing::debug!("Ignoring binary frame from '{}'", admission.username);
            }
            Message::Close(_) => {
                tracing::info!("'{}' requested close", admission.username);
                break;
            }
            // Ping/pong is answered by the WebSocket layer
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
    ReadEnd::Closed
}

/// Route one frame to its use case. Errors only ever affect the sender.
async fn dispatch(state: &AppState, admission: &Admission, tx: &PusherChannel, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!("Ignoring malformed frame from '{}': {}", admission.username, e);
            return;
        }
    };

    match message {
        ClientMessage::Draw {
            id,
            username,
            figure,
        } => {
            match state
                .draw_usecase
                .execute(admission, &id, &username, figure)
                .await
            {
                Ok(_) => {}
                Err(DrawError::EmptyText) => reply_error(tx, &DrawError::EmptyText.to_string()),
                Err(e) => tracing::debug!("Ignored draw from '{}': {}", admission.username, e),
            }
        }
        ClientMessage::Clear { username } => {
            if let Err(e) = state
                .clear_canvas_usecase
                .execute(admission, &username)
                .await
            {
                tracing::debug!("Ignored clear from '{}': {}", admission.username, e);
            }
        }
        ClientMessage::Chat { username, message } => {
            match state
                .send_chat_usecase
                .execute(admission, &username, &message)
                .await
            {
                Ok(_) => {}
                Err(e @ (ChatError::IdentityMismatch | ChatError::NotMember)) => {
                    tracing::debug!("Ignored chat from '{}': {}", admission.username, e);
                }
                Err(e) => {
                    tracing::info!("Rejected chat from '{}': {}", admission.username, e);
                    reply_error(tx, &e.to_string());
                }
            }
        }
        ClientMessage::Connection { .. } => {
            tracing::debug!("Ignoring repeated handshake from '{}'", admission.username);
        }
        ClientMessage::Unknown => {
            tracing::debug!("Ignoring unknown method from '{}'", admission.username);
        }
    }
}

/// Send an `error` notice to this connection only.
fn reply_error(tx: &PusherChannel, message: &str) {
    let notice = ServerMessage::Error {
        message: message.to_string(),
    };
    match notice.to_json() {
        Ok(json) => {
            let _ = tx.send(Outbound::Text(json));
        }
        Err(e) => tracing::error!("Failed to serialize error notice: {}", e),
    }
}

async fn close_socket(sender: &mut SplitSink<WebSocket, Message>, code: u16, reason: &str) {
    let frame = CloseFrame {
        code,
        reason: fit_close_reason(reason).into(),
    };
    if let Err(e) = sender.send(Message::Close(Some(frame))).await {
        tracing::debug!("Failed to send close frame: {}", e);
    }
}

/// Cut `reason` so the close payload (2-byte code + reason) fits in a
/// 125-byte control frame. Cuts on a char boundary.
fn fit_close_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON_BYTES {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON_BYTES;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}

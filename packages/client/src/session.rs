//! One WebSocket session: join, handshake, then relay input and broadcasts.

use std::sync::Arc;

use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use rakugaki_shared::{
    protocol::{ClientMessage, Figure, ServerMessage},
    stroke::{Stroke, StrokeStyle},
    time::get_timestamp,
};
use tokio::{
    net::TcpStream,
    sync::{Mutex, mpsc},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};
use uuid::Uuid;

use crate::{
    api::RoomApi,
    command::{self, Command, HELP},
    error::ClientError,
    formatter::MessageFormatter,
    history::LocalHistory,
    ui::redisplay_prompt,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Writer = SplitSink<Socket, Message>;

/// Room state as this client sees it
#[derive(Debug)]
struct View {
    history: LocalHistory,
    users: Vec<String>,
}

/// Identity and room of one session
pub(crate) struct SessionTarget<'a> {
    pub room_id: &'a str,
    pub username: &'a str,
    pub password: Option<&'a str>,
}

enum Flow {
    Continue,
    Quit,
}

/// Run one session until the user quits (`Ok`) or the connection ends (`Err`).
///
/// Every call is a fresh REST join followed by a fresh admission.
pub(crate) async fn run_session(
    api: &RoomApi,
    target: &SessionTarget<'_>,
    input_rx: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let grant = api
        .join(target.room_id, target.username, target.password)
        .await?;
    let username = grant.username;

    let (ws_stream, _) = connect_async(api.websocket_url())
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    let (mut write, read) = ws_stream.split();

    let handshake = ClientMessage::Connection {
        id: target.room_id.to_string(),
        username: username.clone(),
        token: grant.token,
    };
    write
        .send(Message::text(handshake.to_json()?))
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    tracing::info!("Connected to room {} as '{}'", target.room_id, username);
    println!(
        "\nYou are '{}'. Type /help for commands. Press Ctrl+D to exit.\n",
        username
    );

    let view = Arc::new(Mutex::new(View {
        history: LocalHistory::new(username.clone()),
        users: Vec::new(),
    }));

    let mut read_task = {
        let view = view.clone();
        let room_id = target.room_id.to_string();
        let username = username.clone();
        tokio::spawn(async move { read_loop(read, view, room_id, username).await })
    };

    let mut style = StrokeStyle::default();
    loop {
        tokio::select! {
            result = &mut read_task => {
                return Err(result.unwrap_or_else(|e| ClientError::Disconnected(e.to_string())));
            }
            line = input_rx.recv() => {
                let Some(line) = line else {
                    // Input closed (Ctrl+D)
                    read_task.abort();
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                };
                let flow = handle_input(
                    &line,
                    target.room_id,
                    &username,
                    &mut style,
                    &view,
                    &mut write,
                )
                .await;
                match flow {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => {
                        read_task.abort();
                        return Ok(());
                    }
                    Err(e) => {
                        read_task.abort();
                        return Err(e);
                    }
                }
            }
        }
    }
}

/// Print and apply server frames until the connection ends.
async fn read_loop(
    mut read: SplitStream<Socket>,
    view: Arc<Mutex<View>>,
    room_id: String,
    username: String,
) -> ClientError {
    let mut admitted = false;

    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let Ok(message) = serde_json::from_str::<ServerMessage>(&text) else {
                    print!("{}", MessageFormatter::format_raw_message(&text));
                    redisplay_prompt(&username);
                    continue;
                };
                if matches!(message, ServerMessage::Draws { .. }) {
                    admitted = true;
                }
                let mut view = view.lock().await;
                if let Some(output) = apply_server_message(&mut view, message, &room_id, &username)
                {
                    print!("{}", output);
                    redisplay_prompt(&username);
                }
            }
            Ok(Message::Close(frame)) => {
                let Some(frame) = frame else {
                    tracing::info!("Server closed the connection");
                    break;
                };
                let error = ClientError::Rejected {
                    code: u16::from(frame.code),
                    reason: frame.reason.as_str().to_string(),
                };
                if admitted && !error.is_permanent() {
                    return ClientError::Disconnected(error.to_string());
                }
                return error;
            }
            Err(e) => {
                tracing::warn!("WebSocket read error: {}", e);
                break;
            }
            _ => {}
        }
    }

    if admitted {
        ClientError::Disconnected("Connection lost".to_string())
    } else {
        ClientError::ConnectionError("Connection closed before admission".to_string())
    }
}

/// Update the local view and return what to print, if anything.
fn apply_server_message(
    view: &mut View,
    message: ServerMessage,
    room_id: &str,
    me: &str,
) -> Option<String> {
    match message {
        ServerMessage::Draws { strokes } => {
            let output = MessageFormatter::format_snapshot(room_id, &strokes);
            view.history.apply_snapshot(strokes);
            Some(output)
        }
        ServerMessage::Users { users } => {
            let first = view.users.is_empty();
            view.users = users;
            first.then(|| MessageFormatter::format_users(&view.users, me))
        }
        ServerMessage::Connection { username } => Some(MessageFormatter::format_joined(&username)),
        ServerMessage::Disconnection { username } => Some(MessageFormatter::format_left(&username)),
        ServerMessage::Draw {
            username, figure, ..
        } => {
            let output = MessageFormatter::format_draw(&username, &figure);
            view.history.apply_remote(figure);
            Some(output)
        }
        ServerMessage::Clear { username } => {
            view.history.clear();
            Some(MessageFormatter::format_clear(&username))
        }
        ServerMessage::Chat {
            username,
            message,
            timestamp,
        } => Some(MessageFormatter::format_chat(&username, &message, timestamp)),
        ServerMessage::Error { message } => Some(MessageFormatter::format_error(&message)),
        ServerMessage::Unknown => None,
    }
}

async fn handle_input(
    line: &str,
    room_id: &str,
    username: &str,
    style: &mut StrokeStyle,
    view: &Mutex<View>,
    write: &mut Writer,
) -> Result<Flow, ClientError> {
    let command = match command::parse(line) {
        Ok(command) => command,
        Err(e) => {
            print!("{}", MessageFormatter::format_error(&e.to_string()));
            redisplay_prompt(username);
            return Ok(Flow::Continue);
        }
    };

    let outgoing = match command {
        Command::Draw(shape) => {
            let stroke = Stroke::new(Uuid::new_v4().to_string(), username, style.clone(), shape);
            println!("drew {}", MessageFormatter::describe(&stroke));
            view.lock().await.history.record_own(stroke.clone());
            Some(draw(room_id, username, Figure::Stroke(stroke)))
        }
        Command::Undo => match view.lock().await.history.take_undo() {
            Some(stroke_id) => Some(draw(room_id, username, Figure::undo(stroke_id))),
            None => {
                println!("Nothing to undo");
                None
            }
        },
        Command::Redo => match view.lock().await.history.take_redo() {
            Some(stroke) => Some(draw(room_id, username, Figure::redo(stroke))),
            None => {
                println!("Nothing to redo");
                None
            }
        },
        Command::Clear => {
            view.lock().await.history.clear();
            Some(ClientMessage::Clear {
                username: username.to_string(),
            })
        }
        Command::Chat(message) => {
            // Peers get the broadcast; the sender echoes locally
            print!(
                "{}",
                MessageFormatter::format_chat(username, &message, get_timestamp())
            );
            Some(ClientMessage::Chat {
                username: username.to_string(),
                message,
            })
        }
        Command::SetColor(color) => {
            style.color = color;
            None
        }
        Command::SetWidth(width) => {
            style.width = width;
            None
        }
        Command::Users => {
            let view = view.lock().await;
            print!("{}", MessageFormatter::format_users(&view.users, username));
            None
        }
        Command::Help => {
            println!("{}", HELP);
            None
        }
        Command::Quit => {
            let _ = write.send(Message::Close(None)).await;
            return Ok(Flow::Quit);
        }
    };

    if let Some(message) = outgoing {
        write
            .send(Message::text(message.to_json()?))
            .await
            .map_err(|e| ClientError::Disconnected(format!("Failed to send: {}", e)))?;
    }
    redisplay_prompt(username);
    Ok(Flow::Continue)
}

fn draw(room_id: &str, username: &str, figure: Figure) -> ClientMessage {
    ClientMessage::Draw {
        id: room_id.to_string(),
        username: username.to_string(),
        figure,
    }
}

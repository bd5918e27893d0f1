//! Client execution logic with reconnection support.

use std::time::Duration;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    api::RoomApi,
    error::ClientError,
    session::{SessionTarget, run_session},
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// What to join, and as whom
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Server root URL, e.g. `http://127.0.0.1:8080`
    pub server: String,
    /// Existing room to join
    pub room: Option<String>,
    /// Create a room with this name and join it
    pub create: Option<String>,
    /// Make the created room private
    pub private: bool,
    pub password: Option<String>,
    pub username: String,
}

/// Delay before reconnect attempt `attempt` (1-based): 1 s, 2 s, 4 s, ...
///
/// `None` once the attempts are used up.
pub fn reconnect_delay(attempt: u32) -> Option<Duration> {
    if attempt == 0 || attempt > MAX_RECONNECT_ATTEMPTS {
        return None;
    }
    Some(INITIAL_RECONNECT_DELAY * 2u32.pow(attempt - 1))
}

/// Run the client with reconnection logic
pub async fn run_client(options: ClientOptions) -> Result<(), Box<dyn std::error::Error>> {
    let api = RoomApi::new(options.server.clone());

    let room_id = match (&options.room, &options.create) {
        (Some(room), _) => room.clone(),
        (None, Some(name)) => {
            let room_id = api
                .create_room(name, !options.private, options.password.as_deref())
                .await?;
            println!("Created room {} ('{}')", room_id, name);
            room_id
        }
        (None, None) => return Err("Either --room or --create is required".into()),
    };

    let mut input_rx = spawn_readline(options.username.clone());
    let target = SessionTarget {
        room_id: &room_id,
        username: &options.username,
        password: options.password.as_deref(),
    };
    let mut attempt = 0;

    loop {
        tracing::info!(
            "Joining room {} at {} as '{}'",
            room_id,
            options.server,
            options.username
        );

        match run_session(&api, &target, &mut input_rx).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                break;
            }
            Err(e) if e.is_permanent() => {
                tracing::error!("{}", e);
                return Err(e.into());
            }
            Err(e) => {
                // A session that was admitted starts a new series of attempts
                if matches!(e, ClientError::Disconnected(_)) {
                    attempt = 0;
                }
                tracing::warn!("Connection lost: {}", e);
                attempt += 1;

                let Some(delay) = reconnect_delay(attempt) else {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Exiting.",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    return Err(e.into());
                };
                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    delay.as_secs(),
                    attempt,
                    MAX_RECONNECT_ATTEMPTS
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    Ok(())
}

/// Read lines on a dedicated thread; the channel closes on Ctrl+C or Ctrl+D.
///
/// The thread outlives individual sessions so reconnecting does not spawn a
/// second reader on the same terminal.
fn spawn_readline(username: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", username);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_delay_doubles() {
        // テスト項目: 再接続の待ち時間が 1 秒から倍々に増える
        // given (前提条件):
        let attempts = [1, 2, 3, 4, 5];

        // when (操作):
        let delays: Vec<Option<Duration>> = attempts.iter().map(|a| reconnect_delay(*a)).collect();

        // then (期待する結果):
        assert_eq!(
            delays,
            vec![
                Some(Duration::from_secs(1)),
                Some(Duration::from_secs(2)),
                Some(Duration::from_secs(4)),
                Some(Duration::from_secs(8)),
                Some(Duration::from_secs(16)),
            ]
        );
    }

    #[test]
    fn test_reconnect_gives_up_after_max_attempts() {
        // テスト項目: 上限回数を超えると再接続しない
        // given (前提条件):
        let attempt = MAX_RECONNECT_ATTEMPTS + 1;

        // when (操作):
        let delay = reconnect_delay(attempt);

        // then (期待する結果):
        assert_eq!(delay, None);
        assert_eq!(reconnect_delay(0), None);
    }
}

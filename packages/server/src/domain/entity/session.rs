//! In-memory runtime state of an occupied room.
//!
//! A `Session` owns the live stroke list, the participant map and the chat
//! ring buffer of exactly one room. It is always accessed through the room's
//! own lock (see `infrastructure::session::SessionRegistry`), so every method
//! here assumes exclusive access.

use std::collections::{HashMap, VecDeque};

use rakugaki_shared::protocol::ServerMessage;
use uuid::Uuid;

use crate::domain::{
    error::AdmissionError,
    guard::SpamGuard,
    history::StrokeHistory,
    message_pusher::{Outbound, PusherChannel},
    value_object::{RoomId, Timestamp, Username},
};

/// A connected participant.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Distinguishes two sockets that used the same username over time
    pub connection_id: Uuid,
    pub username: Username,
    pub connected_at: Timestamp,
    pub last_activity_at: Timestamp,
    sender: PusherChannel,
}

impl Participant {
    pub fn new(
        connection_id: Uuid,
        username: Username,
        connected_at: Timestamp,
        sender: PusherChannel,
    ) -> Self {
        Self {
            connection_id,
            username,
            connected_at,
            last_activity_at: connected_at,
            sender,
        }
    }

    fn push(&self, outbound: Outbound) -> bool {
        self.sender.send(outbound).is_ok()
    }
}

/// One accepted chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub username: Username,
    pub message: String,
    pub timestamp: Timestamp,
}

#[derive(Debug)]
pub struct Session {
    pub room_id: RoomId,
    pub history: StrokeHistory,
    pub spam_guard: SpamGuard,
    participants: HashMap<Username, Participant>,
    chat: VecDeque<ChatEntry>,
    capacity: usize,
    chat_limit: usize,
    loaded: bool,
    closed: bool,
}

impl Session {
    pub fn new(room_id: RoomId, capacity: usize, chat_limit: usize) -> Self {
        Self {
            room_id,
            history: StrokeHistory::new(),
            spam_guard: SpamGuard::new(),
            participants: HashMap::new(),
            chat: VecDeque::with_capacity(chat_limit),
            capacity,
            chat_limit,
            loaded: false,
            closed: false,
        }
    }

    /// Whether persisted strokes have been loaded into this session.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn load(&mut self, history: StrokeHistory) {
        self.history = history;
        self.loaded = true;
    }

    /// A closed session has been flushed and discarded; it must not admit anyone.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Register a participant, enforcing capacity and per-room username uniqueness.
    pub fn admit(&mut self, participant: Participant) -> Result<(), AdmissionError> {
        if self.participants.len() >= self.capacity {
            return Err(AdmissionError::RoomFull(self.capacity));
        }
        if self.participants.contains_key(&participant.username) {
            return Err(AdmissionError::UsernameTaken(
                participant.username.as_str().to_string(),
            ));
        }
        self.participants
            .insert(participant.username.clone(), participant);
        Ok(())
    }

    /// Remove `username` if it is still bound to `connection_id`.
    pub fn remove(&mut self, username: &Username, connection_id: Uuid) -> Option<Participant> {
        let matches = self
            .participants
            .get(username)
            .is_some_and(|p| p.connection_id == connection_id);
        if !matches {
            return None;
        }
        self.participants.remove(username)
    }

    pub fn is_member(&self, username: &Username, connection_id: Uuid) -> bool {
        self.participants
            .get(username)
            .is_some_and(|p| p.connection_id == connection_id)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Usernames of every participant, sorted.
    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .participants
            .keys()
            .map(|u| u.as_str().to_string())
            .collect();
        names.sort();
        names
    }

    /// Refresh the idle-eviction clock of a participant.
    pub fn touch(&mut self, username: &Username, now: Timestamp) {
        if let Some(participant) = self.participants.get_mut(username) {
            participant.last_activity_at = now;
        }
    }

    /// Participants whose last activity is older than `timeout_millis`.
    pub fn idle_participants(&self, now: Timestamp, timeout_millis: i64) -> Vec<Username> {
        self.participants
            .values()
            .filter(|p| p.last_activity_at.elapsed_until(now) > timeout_millis)
            .map(|p| p.username.clone())
            .collect()
    }

    /// Send a frame to one participant. Returns whether it was enqueued.
    pub fn push_to(&self, username: &Username, message: &ServerMessage) -> bool {
        let Some(participant) = self.participants.get(username) else {
            return false;
        };
        match message.to_json() {
            Ok(json) => participant.push(Outbound::Text(json)),
            Err(e) => {
                tracing::error!("Failed to serialize message for '{}': {}", username, e);
                false
            }
        }
    }

    /// Send a frame to every participant except `exclude`.
    ///
    /// A failed send to one peer is logged and skipped; it never stops the
    /// fan-out. Returns the number of peers the frame was enqueued for.
    pub fn broadcast(&self, message: &ServerMessage, exclude: Option<&Username>) -> usize {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize broadcast in room '{}': {}", self.room_id, e);
                return 0;
            }
        };

        let mut delivered = 0;
        for (username, participant) in &self.participants {
            if Some(username) == exclude {
                continue;
            }
            if participant.push(Outbound::Text(json.clone())) {
                delivered += 1;
            } else {
                tracing::warn!(
                    "Failed to push message to '{}' in room '{}'",
                    username,
                    self.room_id
                );
            }
        }
        delivered
    }

    /// Ask the writer task of a participant to close its socket.
    pub fn close_participant(&self, username: &Username, code: u16, reason: &str) -> bool {
        self.participants.get(username).is_some_and(|p| {
            p.push(Outbound::Close {
                code,
                reason: reason.to_string(),
            })
        })
    }

    /// Ask every participant's writer task to close its socket.
    pub fn close_all(&self, code: u16, reason: &str) {
        for username in self.participants.keys() {
            self.close_participant(username, code, reason);
        }
    }

    /// Append to the chat ring buffer, dropping the oldest entry when full.
    pub fn record_chat(&mut self, entry: ChatEntry) {
        if self.chat.len() >= self.chat_limit {
            self.chat.pop_front();
        }
        self.chat.push_back(entry);
    }

    pub fn chat_log(&self) -> impl Iterator<Item = &ChatEntry> {
        self.chat.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{guard::SpamReason, value_object::RoomIdFactory};
    use tokio::sync::mpsc;

    fn user(name: &str) -> Username {
        Username::new(name.to_string()).unwrap()
    }

    fn participant(name: &str) -> (Participant, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Participant::new(Uuid::new_v4(), user(name), Timestamp::new(1_000), tx),
            rx,
        )
    }

    fn session(capacity: usize) -> Session {
        Session::new(RoomIdFactory::generate(), capacity, 3)
    }

    #[test]
    fn test_admit_rejects_duplicate_username() {
        // テスト項目: 同じユーザー名の再入室は重複として拒否される
        // given (前提条件):
        let mut session = session(10);
        let (first, _rx1) = participant("alice");
        let (second, _rx2) = participant("alice");
        session.admit(first).unwrap();

        // when (操作):
        let result = session.admit(second);

        // then (期待する結果):
        assert_eq!(result, Err(AdmissionError::UsernameTaken("alice".to_string())));
        assert_eq!(session.participant_count(), 1);
    }

    #[test]
    fn test_admit_rejects_when_full() {
        // テスト項目: 定員に達したルームへの入室は拒否される
        // given (前提条件):
        let mut session = session(2);
        let mut receivers = Vec::new();
        for name in ["alice", "bob"] {
            let (p, rx) = participant(name);
            receivers.push(rx);
            session.admit(p).unwrap();
        }

        // when (操作):
        let (carol, _rx) = participant("carol");
        let result = session.admit(carol);

        // then (期待する結果):
        assert_eq!(result, Err(AdmissionError::RoomFull(2)));
        assert_eq!(session.participant_count(), 2);
    }

    #[test]
    fn test_remove_requires_matching_connection() {
        // テスト項目: 接続 ID が一致しない場合は削除されない
        // given (前提条件):
        let mut session = session(10);
        let (alice, _rx) = participant("alice");
        let connection_id = alice.connection_id;
        session.admit(alice).unwrap();

        // when (操作):
        let stale = session.remove(&user("alice"), Uuid::new_v4());
        let current = session.remove(&user("alice"), connection_id);

        // then (期待する結果):
        assert!(stale.is_none());
        assert!(current.is_some());
        assert!(session.is_empty());
    }

    #[test]
    fn test_rejoin_does_not_reset_chat_frequency() {
        // テスト項目: 退室して再入室しても送信頻度の履歴はリセットされない
        // given (前提条件):
        let mut session = session(10);
        let (alice, _rx) = participant("alice");
        let connection_id = alice.connection_id;
        session.admit(alice).unwrap();
        for (text, at) in [("one", 0), ("two", 100), ("three", 200)] {
            session.spam_guard.check("alice", text, at).unwrap();
        }

        // when (操作):
        session.remove(&user("alice"), connection_id);
        let (alice_again, _rx2) = participant("alice");
        session.admit(alice_again).unwrap();
        let result = session.spam_guard.check("alice", "four", 300);

        // then (期待する結果):
        assert_eq!(result, Err(SpamReason::TooFrequent));
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender_and_survives_closed_peer() {
        // テスト項目: ブロードキャストは送信者を除外し、切断済みの相手がいても継続する
        // given (前提条件):
        let mut session = session(10);
        let (alice, mut alice_rx) = participant("alice");
        let (bob, bob_rx) = participant("bob");
        let (carol, mut carol_rx) = participant("carol");
        session.admit(alice).unwrap();
        session.admit(bob).unwrap();
        session.admit(carol).unwrap();
        drop(bob_rx);

        // when (操作):
        let message = ServerMessage::Clear {
            username: "alice".to_string(),
        };
        let delivered = session.broadcast(&message, Some(&user("alice")));

        // then (期待する結果):
        assert_eq!(delivered, 1);
        assert!(alice_rx.try_recv().is_err());
        assert!(matches!(carol_rx.recv().await, Some(Outbound::Text(json)) if json.contains("\"clear\"")));
    }

    #[test]
    fn test_chat_log_is_bounded() {
        // テスト項目: チャットログは上限件数を超えると古いものから捨てられる
        // given (前提条件):
        let mut session = session(10);

        // when (操作):
        for i in 0..5 {
            session.record_chat(ChatEntry {
                username: user("alice"),
                message: format!("m{}", i),
                timestamp: Timestamp::new(i),
            });
        }

        // then (期待する結果):
        let messages: Vec<&str> = session.chat_log().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_idle_participants_are_detected() {
        // テスト項目: 最終アクティビティがタイムアウトを超えた参加者が検出される
        // given (前提条件):
        let mut session = session(10);
        let (alice, _rx1) = participant("alice");
        let (bob, _rx2) = participant("bob");
        session.admit(alice).unwrap();
        session.admit(bob).unwrap();
        session.touch(&user("bob"), Timestamp::new(500_000));

        // when (操作):
        let idle = session.idle_participants(Timestamp::new(700_000), 600_000);

        // then (期待する結果):
        assert_eq!(idle, vec![user("alice")]);
    }
}

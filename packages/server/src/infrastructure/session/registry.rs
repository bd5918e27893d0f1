//! Arena of active room sessions.
//!
//! Each occupied room has exactly one `Session`, guarded by its own lock so
//! that rooms never serialize on each other. The arena map itself is only held
//! for lookups and insertions, never across an `.await` on a session lock.
//!
//! Lock order is always *session, then arena* (see [`SessionRegistry::discard`]).
//! Admission re-checks [`Session::is_closed`] after taking the session lock,
//! because a session may have been flushed and discarded between the lookup
//! and the lock.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::Mutex;

use crate::domain::{RepositoryError, RoomId, Session, StrokeHistory, StrokeRepository};

pub type SharedSession = Arc<Mutex<Session>>;

pub struct SessionRegistry {
    sessions: Mutex<HashMap<RoomId, SharedSession>>,
    stroke_repository: Arc<dyn StrokeRepository>,
    /// Global write counter; orders fire-and-forget stroke saves
    revision: AtomicU64,
    capacity: usize,
    chat_limit: usize,
}

impl SessionRegistry {
    pub fn new(
        stroke_repository: Arc<dyn StrokeRepository>,
        capacity: usize,
        chat_limit: usize,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            stroke_repository,
            revision: AtomicU64::new(0),
            capacity,
            chat_limit,
        }
    }

    /// Session of `room_id`, created empty (not yet loaded) if the room is idle.
    pub async fn open(&self, room_id: &RoomId) -> SharedSession {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(room_id.clone())
            .or_insert_with(|| {
                tracing::debug!("Creating session for room '{}'", room_id);
                Arc::new(Mutex::new(Session::new(
                    room_id.clone(),
                    self.capacity,
                    self.chat_limit,
                )))
            })
            .clone()
    }

    pub async fn get(&self, room_id: &RoomId) -> Option<SharedSession> {
        let sessions = self.sessions.lock().await;
        sessions.get(room_id).cloned()
    }

    /// Drop `session` from the arena if it is still the one registered for
    /// `room_id`. Callers hold the session lock and have already closed it.
    pub async fn discard(&self, room_id: &RoomId, session: &SharedSession) {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(room_id)
            .is_some_and(|current| Arc::ptr_eq(current, session))
        {
            sessions.remove(room_id);
            tracing::debug!("Discarded session for room '{}'", room_id);
        }
    }

    /// Snapshot of every active session.
    pub async fn active(&self) -> Vec<(RoomId, SharedSession)> {
        let sessions = self.sessions.lock().await;
        sessions
            .iter()
            .map(|(id, session)| (id.clone(), session.clone()))
            .collect()
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Number of connected users of `room_id`, zero when the room is idle.
    pub async fn participant_count(&self, room_id: &RoomId) -> usize {
        match self.get(room_id).await {
            Some(session) => session.lock().await.participant_count(),
            None => 0,
        }
    }

    pub fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Load persisted strokes into `session` on its first admission.
    pub async fn ensure_loaded(&self, session: &mut Session) -> Result<(), RepositoryError> {
        if session.is_loaded() {
            return Ok(());
        }
        let strokes = self.stroke_repository.load(&session.room_id).await?;
        tracing::info!(
            "Loaded {} stroke(s) for room '{}'",
            strokes.len(),
            session.room_id
        );
        session.load(StrokeHistory::from_strokes(strokes));
        Ok(())
    }

    /// Write the current stroke list of `session` without waiting for it.
    ///
    /// The revision is taken while the caller holds the session lock, so the
    /// store can drop a write that finishes after a newer one.
    pub fn persist_in_background(&self, session: &Session) {
        let revision = self.next_revision();
        let room_id = session.room_id.clone();
        let strokes = session.history.strokes().to_vec();
        let repository = self.stroke_repository.clone();
        tokio::spawn(async move {
            if let Err(e) = repository.save(&room_id, revision, &strokes).await {
                tracing::warn!("Failed to persist strokes of room '{}': {}", room_id, e);
            }
        });
    }

    /// Write the current stroke list of `session` and wait for it.
    pub async fn flush(&self, session: &Session) -> Result<(), RepositoryError> {
        if !session.is_loaded() {
            // Nothing was read, so nothing can have changed.
            return Ok(());
        }
        let revision = self.next_revision();
        self.stroke_repository
            .save(&session.room_id, revision, session.history.strokes())
            .await?;
        tracing::info!(
            "Flushed {} stroke(s) for room '{}'",
            session.history.len(),
            session.room_id
        );
        Ok(())
    }
}

//! Stroke history engine.
//!
//! Undo and redo are scoped per author over one shared, ordered stroke list.
//! There is no global undo pointer and no server-side redo stack: each client
//! decides which of its own strokes to undo (by id) and which payload to redo,
//! and this engine only authorizes and applies the request.
//!
//! - `add` appends a stroke the requester authored.
//! - `undo` removes a stroke by id, only if the requester authored it.
//! - `redo` re-appends a full stroke payload, only if the requester authored it.
//!
//! Strokes are never mutated in place once stored.

use rakugaki_shared::stroke::Stroke;
use thiserror::Error;

use super::value_object::Username;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("Stroke '{0}' already exists")]
    DuplicateId(String),

    #[error("Stroke '{0}' not found")]
    NotFound(String),

    #[error("Stroke '{stroke_id}' is authored by '{author}', not '{requester}'")]
    NotAuthor {
        stroke_id: String,
        author: String,
        requester: String,
    },
}

/// Ordered stroke list of one room.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeHistory {
    strokes: Vec<Stroke>,
}

impl StrokeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_strokes(strokes: Vec<Stroke>) -> Self {
        Self { strokes }
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn contains(&self, stroke_id: &str) -> bool {
        self.strokes.iter().any(|s| s.id == stroke_id)
    }

    /// Append a new stroke authored by `requester`.
    pub fn add(&mut self, stroke: Stroke, requester: &Username) -> Result<(), HistoryError> {
        ensure_author(&stroke, requester)?;
        if self.contains(&stroke.id) {
            return Err(HistoryError::DuplicateId(stroke.id));
        }
        self.strokes.push(stroke);
        Ok(())
    }

    /// Remove the stroke `stroke_id` if `requester` authored it.
    pub fn undo(&mut self, stroke_id: &str, requester: &Username) -> Result<Stroke, HistoryError> {
        let index = self
            .strokes
            .iter()
            .position(|s| s.id == stroke_id)
            .ok_or_else(|| HistoryError::NotFound(stroke_id.to_string()))?;
        ensure_author(&self.strokes[index], requester)?;
        Ok(self.strokes.remove(index))
    }

    /// Restore a previously undone stroke, keeping its id and author.
    pub fn redo(&mut self, stroke: Stroke, requester: &Username) -> Result<(), HistoryError> {
        self.add(stroke, requester)
    }

    /// Drop every stroke. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.strokes.len();
        self.strokes.clear();
        removed
    }
}

fn ensure_author(stroke: &Stroke, requester: &Username) -> Result<(), HistoryError> {
    if stroke.username != requester.as_str() {
        return Err(HistoryError::NotAuthor {
            stroke_id: stroke.id.clone(),
            author: stroke.username.clone(),
            requester: requester.as_str().to_string(),
        });
    }
    Ok(())
}

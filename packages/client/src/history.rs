//! Local canvas and per-author undo/redo bookkeeping.
//!
//! The server keeps no redo stack and never picks the undo target, so each
//! client tracks its own strokes:
//!
//! - `undo` holds the ids of this user's strokes, oldest first
//! - `redo` holds full payloads of strokes this user undid, most recent last
//!
//! Any new stroke by this user drops the redo stack.

use rakugaki_shared::{
    protocol::{Figure, RedoFigure},
    stroke::Stroke,
};

#[derive(Debug, Default)]
pub struct LocalHistory {
    username: String,
    canvas: Vec<Stroke>,
    undo: Vec<String>,
    redo: Vec<Stroke>,
}

impl LocalHistory {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn canvas(&self) -> &[Stroke] {
        &self.canvas
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Record a stroke this user just drew.
    pub fn record_own(&mut self, stroke: Stroke) {
        self.undo.push(stroke.id.clone());
        self.redo.clear();
        self.canvas.push(stroke);
    }

    /// Undo this user's latest stroke locally and return its id for the server.
    ///
    /// A stroke that is no longer on the canvas (cleared by someone else) is
    /// skipped; the server ignores undo of an unknown id anyway.
    pub fn take_undo(&mut self) -> Option<String> {
        while let Some(id) = self.undo.pop() {
            if let Some(stroke) = self.remove_from_canvas(&id) {
                self.redo.push(stroke);
                return Some(id);
            }
        }
        None
    }

    /// Redo the most recently undone stroke and return its payload for the server.
    pub fn take_redo(&mut self) -> Option<Stroke> {
        let stroke = self.redo.pop()?;
        self.undo.push(stroke.id.clone());
        self.canvas.push(stroke.clone());
        Some(stroke)
    }

    /// Replace everything with a snapshot from the server.
    pub fn apply_snapshot(&mut self, strokes: Vec<Stroke>) {
        self.undo = strokes
            .iter()
            .filter(|s| s.username == self.username)
            .map(|s| s.id.clone())
            .collect();
        self.redo.clear();
        self.canvas = strokes;
    }

    /// Apply a `draw` broadcast from a peer.
    pub fn apply_remote(&mut self, figure: Figure) {
        match figure {
            Figure::Stroke(stroke) | Figure::Redo(RedoFigure { stroke, .. }) => {
                if self.canvas.iter().any(|s| s.id == stroke.id) {
                    return;
                }
                if stroke.username == self.username {
                    // Same user on another device
                    self.undo.push(stroke.id.clone());
                    self.redo.clear();
                }
                self.canvas.push(stroke);
            }
            Figure::Undo(undo) => {
                self.remove_from_canvas(&undo.stroke_id);
                self.undo.retain(|id| *id != undo.stroke_id);
            }
        }
    }

    /// Empty the canvas and both stacks, for a local or remote clear.
    pub fn clear(&mut self) {
        self.canvas.clear();
        self.undo.clear();
        self.redo.clear();
    }

    fn remove_from_canvas(&mut self, id: &str) -> Option<Stroke> {
        let index = self.canvas.iter().position(|s| s.id == id)?;
        Some(self.canvas.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rakugaki_shared::stroke::{Point, Shape, StrokeStyle};

    fn line(id: &str, username: &str) -> Stroke {
        Stroke::new(
            id,
            username,
            StrokeStyle::default(),
            Shape::Line {
                start: Point::new(0.0, 0.0),
                end: Point::new(1.0, 1.0),
            },
        )
    }

    fn ids(history: &LocalHistory) -> Vec<&str> {
        history.canvas().iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_undo_targets_own_latest_stroke() {
        // テスト項目: undo は他人のストロークを飛ばして自分の最新ストロークを対象にする
        // given (前提条件):
        let mut history = LocalHistory::new("alice");
        history.record_own(line("a1", "alice"));
        history.apply_remote(Figure::Stroke(line("b1", "bob")));

        // when (操作):
        let undone = history.take_undo();

        // then (期待する結果):
        assert_eq!(undone.as_deref(), Some("a1"));
        assert_eq!(ids(&history), vec!["b1"]);
        assert!(history.can_redo());
    }

    #[test]
    fn test_redo_restores_original_payload() {
        // テスト項目: redo は undo したストロークを ID と作者そのままに戻す
        // given (前提条件):
        let mut history = LocalHistory::new("alice");
        let stroke = line("a1", "alice");
        history.record_own(stroke.clone());
        history.take_undo();

        // when (操作):
        let redone = history.take_redo();

        // then (期待する結果):
        assert_eq!(redone, Some(stroke));
        assert_eq!(ids(&history), vec!["a1"]);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_new_stroke_drops_redo_stack() {
        // テスト項目: 新しく描くと redo スタックが破棄される
        // given (前提条件):
        let mut history = LocalHistory::new("alice");
        history.record_own(line("a1", "alice"));
        history.take_undo();

        // when (操作):
        history.record_own(line("a2", "alice"));

        // then (期待する結果):
        assert!(!history.can_redo());
        assert_eq!(history.take_redo(), None);
    }

    #[test]
    fn test_snapshot_rebuilds_undo_stack_from_own_strokes() {
        // テスト項目: スナップショットから自分のストロークだけで undo スタックが再構築される
        // given (前提条件):
        let mut history = LocalHistory::new("alice");
        let snapshot = vec![line("a1", "alice"), line("b1", "bob"), line("a2", "alice")];

        // when (操作):
        history.apply_snapshot(snapshot);

        // then (期待する結果):
        assert_eq!(history.take_undo().as_deref(), Some("a2"));
        assert_eq!(history.take_undo().as_deref(), Some("a1"));
        assert_eq!(history.take_undo(), None);
        assert_eq!(ids(&history), vec!["b1"]);
    }

    #[test]
    fn test_remote_clear_empties_everything() {
        // テスト項目: 他人の clear で canvas と undo/redo スタックが空になる
        // given (前提条件):
        let mut history = LocalHistory::new("alice");
        history.record_own(line("a1", "alice"));
        history.record_own(line("a2", "alice"));
        history.take_undo();

        // when (操作):
        history.clear();

        // then (期待する結果):
        assert!(history.canvas().is_empty());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_remote_undo_removes_peer_stroke() {
        // テスト項目: 他人の undo で該当ストロークが canvas から消える
        // given (前提条件):
        let mut history = LocalHistory::new("alice");
        history.apply_remote(Figure::Stroke(line("b1", "bob")));
        history.record_own(line("a1", "alice"));

        // when (操作):
        history.apply_remote(Figure::undo("b1"));

        // then (期待する結果):
        assert_eq!(ids(&history), vec!["a1"]);
        assert!(history.can_undo());
    }

    #[test]
    fn test_duplicate_remote_stroke_is_ignored() {
        // テスト項目: 同じ ID のストロークを二重に受け取っても 1 本だけ残る
        // given (前提条件):
        let mut history = LocalHistory::new("alice");
        history.apply_remote(Figure::Stroke(line("b1", "bob")));

        // when (操作):
        history.apply_remote(Figure::Stroke(line("b1", "bob")));

        // then (期待する結果):
        assert_eq!(ids(&history), vec!["b1"]);
    }
}

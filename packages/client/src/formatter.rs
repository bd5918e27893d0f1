//! Message formatting utilities for client display.

use rakugaki_shared::{
    protocol::Figure,
    stroke::{Shape, Stroke},
    time::timestamp_to_rfc3339,
};

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the snapshot received right after joining
    pub fn format_snapshot(room_id: &str, strokes: &[Stroke]) -> String {
        format!(
            "\n{}\nJoined room {} ({} stroke(s) on the canvas)\n{}\n",
            RULE,
            room_id,
            strokes.len(),
            RULE
        )
    }

    /// Format the participant list, marking the current user
    ///
    /// # Arguments
    ///
    /// * `users` - Usernames in the room
    /// * `me` - The current user's name (marked as "me")
    pub fn format_users(users: &[String], me: &str) -> String {
        let mut output = String::from("\nParticipants:\n");
        if users.is_empty() {
            output.push_str("(No participants)\n");
        }
        for user in users {
            let suffix = if user == me { " (me)" } else { "" };
            output.push_str(&format!("  {}{}\n", user, suffix));
        }
        output
    }

    pub fn format_joined(username: &str) -> String {
        format!("\n+ {} joined\n", username)
    }

    pub fn format_left(username: &str) -> String {
        format!("\n- {} left\n", username)
    }

    /// Format a chat message
    ///
    /// # Arguments
    ///
    /// * `from` - The sender
    /// * `message` - The message content
    /// * `sent_at` - Unix timestamp in milliseconds
    pub fn format_chat(from: &str, message: &str, sent_at: i64) -> String {
        format!(
            "\n@{}: {}\n  sent at {}\n",
            from,
            message,
            timestamp_to_rfc3339(sent_at)
        )
    }

    /// Format a peer's draw, undo or redo
    pub fn format_draw(username: &str, figure: &Figure) -> String {
        match figure {
            Figure::Stroke(stroke) => {
                format!("\n* {} drew {}\n", username, Self::describe(stroke))
            }
            Figure::Redo(redo) => {
                format!("\n* {} redid {}\n", username, Self::describe(&redo.stroke))
            }
            Figure::Undo(undo) => format!("\n* {} undid {}\n", username, undo.stroke_id),
        }
    }

    pub fn format_clear(username: &str) -> String {
        format!("\n* {} cleared the canvas\n", username)
    }

    /// Format an error notice sent to this connection only
    pub fn format_error(message: &str) -> String {
        format!("\n! {}\n", message)
    }

    /// Format a raw text frame that did not parse
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }

    /// One-line description of a stroke, e.g. `line s1 (#000000, 2px)`.
    pub fn describe(stroke: &Stroke) -> String {
        let detail = match &stroke.shape {
            Shape::Text { text, .. } => format!(" \"{}\"", text),
            Shape::Path { points } | Shape::Polygon { points, .. } => {
                format!(" [{} points]", points.len())
            }
            _ => String::new(),
        };
        format!(
            "{}{} {} ({}, {}px)",
            stroke.shape.kind(),
            detail,
            stroke.id,
            stroke.style.color,
            stroke.style.width
        )
    }
}

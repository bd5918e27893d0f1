//! Stroke data model.
//!
//! A stroke is one immutable drawing record. The server never interprets the
//! geometry; it only needs the `id` (the key used by undo) and the `username`
//! (the author used for authorization). Everything else is carried through
//! verbatim so the rasterizer on each client sees exactly what the author drew.

use serde::{Deserialize, Serialize};

/// A point on the canvas, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

fn default_opacity() -> f64 {
    1.0
}

/// Style attributes common to every stroke kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            width: 2.0,
            opacity: default_opacity(),
        }
    }
}

/// Geometry of a stroke, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Shape {
    /// Freehand brush path.
    Path { points: Vec<Point> },
    Line {
        start: Point,
        end: Point,
    },
    Rectangle {
        start: Point,
        end: Point,
        #[serde(default)]
        filled: bool,
    },
    Circle {
        center: Point,
        radius: f64,
        #[serde(default)]
        filled: bool,
    },
    Arrow {
        start: Point,
        end: Point,
    },
    Polygon {
        points: Vec<Point>,
        #[serde(default)]
        filled: bool,
    },
    Text {
        position: Point,
        text: String,
        font_size: f64,
    },
    /// Placement of an uploaded image; `src` is a URL or data URI.
    Image {
        position: Point,
        width: f64,
        height: f64,
        src: String,
    },
    /// Flood fill seeded at `position` with the stroke color.
    Fill { position: Point },
    /// Placeholder recording that a group of strokes was moved.
    Move {
        stroke_ids: Vec<String>,
        dx: f64,
        dy: f64,
    },
}

impl Shape {
    /// Wire name of the shape kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Path { .. } => "path",
            Shape::Line { .. } => "line",
            Shape::Rectangle { .. } => "rectangle",
            Shape::Circle { .. } => "circle",
            Shape::Arrow { .. } => "arrow",
            Shape::Polygon { .. } => "polygon",
            Shape::Text { .. } => "text",
            Shape::Image { .. } => "image",
            Shape::Fill { .. } => "fill",
            Shape::Move { .. } => "move",
        }
    }
}

/// One immutable drawing operation attributed to an author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Client-generated id, unique within the room's lifetime.
    pub id: String,
    /// Author of the stroke.
    pub username: String,
    #[serde(flatten)]
    pub style: StrokeStyle,
    #[serde(flatten)]
    pub shape: Shape,
}

impl Stroke {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        style: StrokeStyle,
        shape: Shape,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            style,
            shape,
        }
    }

    /// Free text carried by the stroke, if any.
    pub fn text(&self) -> Option<&str> {
        match &self.shape {
            Shape::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Replace the free text of a text stroke. No-op for other kinds.
    pub fn set_text(&mut self, value: String) {
        if let Shape::Text { text, .. } = &mut self.shape {
            *text = value;
        }
    }
}

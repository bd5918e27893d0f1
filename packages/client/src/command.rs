//! Input line parsing.
//!
//! Lines starting with `/` are commands; anything else is a chat message.

use rakugaki_shared::stroke::{Point, Shape};
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  /line x1 y1 x2 y2     draw a line
  /rect x1 y1 x2 y2     draw a rectangle
  /circle x y r         draw a circle
  /arrow x1 y1 x2 y2    draw an arrow
  /text x y words...    place text
  /color #rrggbb        set the stroke color
  /width n              set the stroke width
  /undo, /redo          undo or redo your own last stroke
  /clear                clear the canvas for everyone
  /users                list participants
  /help                 show this help
  /quit                 leave the room
Any other line is sent as a chat message.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Draw(Shape),
    SetColor(String),
    SetWidth(f64),
    Undo,
    Redo,
    Clear,
    Users,
    Help,
    Quit,
    Chat(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Unknown command '/{0}' (try /help)")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("'{0}' is not a number")]
    InvalidNumber(String),
}

/// Parse one trimmed, non-empty input line.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Chat(line.to_string()));
    };
    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    match name {
        "line" => {
            let [x1, y1, x2, y2] = numbers(&args, "/line x1 y1 x2 y2")?;
            Ok(Command::Draw(Shape::Line {
                start: Point::new(x1, y1),
                end: Point::new(x2, y2),
            }))
        }
        "rect" => {
            let [x1, y1, x2, y2] = numbers(&args, "/rect x1 y1 x2 y2")?;
            Ok(Command::Draw(Shape::Rectangle {
                start: Point::new(x1, y1),
                end: Point::new(x2, y2),
                filled: false,
            }))
        }
        "circle" => {
            let [x, y, radius] = numbers(&args, "/circle x y r")?;
            Ok(Command::Draw(Shape::Circle {
                center: Point::new(x, y),
                radius,
                filled: false,
            }))
        }
        "arrow" => {
            let [x1, y1, x2, y2] = numbers(&args, "/arrow x1 y1 x2 y2")?;
            Ok(Command::Draw(Shape::Arrow {
                start: Point::new(x1, y1),
                end: Point::new(x2, y2),
            }))
        }
        "text" => {
            const USAGE: &str = "/text x y words...";
            if args.len() < 3 {
                return Err(ParseError::Usage(USAGE));
            }
            let [x, y] = numbers(&args[..2], USAGE)?;
            Ok(Command::Draw(Shape::Text {
                position: Point::new(x, y),
                text: args[2..].join(" "),
                font_size: 16.0,
            }))
        }
        "color" => match args.as_slice() {
            [color] if is_hex_color(color) => Ok(Command::SetColor(color.to_string())),
            _ => Err(ParseError::Usage("/color #rrggbb")),
        },
        "width" => {
            let [width] = numbers(&args, "/width n")?;
            Ok(Command::SetWidth(width))
        }
        "undo" => Ok(Command::Undo),
        "redo" => Ok(Command::Redo),
        "clear" => Ok(Command::Clear),
        "users" => Ok(Command::Users),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ParseError::UnknownCommand(other.to_string())),
    }
}

fn numbers<const N: usize>(args: &[&str], usage: &'static str) -> Result<[f64; N], ParseError> {
    if args.len() != N {
        return Err(ParseError::Usage(usage));
    }
    let mut values = [0.0; N];
    for (value, arg) in values.iter_mut().zip(args) {
        *value = arg
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParseError::InvalidNumber(arg.to_string()))?;
    }
    Ok(values)
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

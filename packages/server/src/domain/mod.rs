//! Domain layer: value objects, entities, persistence interfaces, the stroke
//! history engine and the abuse guards.

pub mod entity;
pub mod error;
pub mod guard;
pub mod history;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use entity::{ChatEntry, Participant, Room, Session};
pub use error::{AdmissionError, RepositoryError, ValueObjectError};
pub use history::{HistoryError, StrokeHistory};
pub use message_pusher::{Outbound, PusherChannel};
pub use repository::{RoomRepository, StrokeRepository};
pub use value_object::{RoomId, RoomIdFactory, RoomName, Timestamp, Username, Visibility};

#[cfg(test)]
pub use repository::{MockRoomRepository, MockStrokeRepository};

pub mod room;

pub use room::{InMemoryRoomRepository, InMemoryStrokeRepository};

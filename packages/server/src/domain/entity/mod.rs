//! Domain entities.

pub mod room;
pub mod session;

pub use room::Room;
pub use session::{ChatEntry, Participant, Session};

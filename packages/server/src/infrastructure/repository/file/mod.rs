//! JSON-file persistence used by the server binary.

pub mod room;
pub mod store;
pub mod stroke;

pub use room::FileRoomRepository;
pub use store::JsonFileStore;
pub use stroke::FileStrokeRepository;

//! Repository 実装（ファイル永続化とインメモリ）

pub mod file;
pub mod inmemory;

pub use file::{FileRoomRepository, FileStrokeRepository};
pub use inmemory::{InMemoryRoomRepository, InMemoryStrokeRepository};

//! Infrastructure layer: persistence, access control and the session arena.

pub mod auth;
pub mod repository;
pub mod session;

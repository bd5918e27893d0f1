//! Access control: join tokens and room password hashes.

pub mod password;
pub mod token;

pub use password::{PasswordError, RoomPasswordHasher};
pub use token::{JoinClaims, JoinTokenIssuer, TokenError};

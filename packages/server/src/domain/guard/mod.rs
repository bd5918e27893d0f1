//! Abuse guards applied before any state mutation.

pub mod rate_limit;
pub mod sanitize;
pub mod spam;

pub use rate_limit::RateLimiter;
pub use sanitize::{sanitize_room_name, sanitize_text, sanitize_username};
pub use spam::{SpamGuard, SpamReason};

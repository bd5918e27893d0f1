//! Per-connection sliding-window rate limiter.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

/// Counts messages of one connection over a sliding time window.
///
/// Exceeding the cap is terminal for the connection; the limiter itself only
/// reports the verdict.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_messages: usize,
    hits: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_messages: usize) -> Self {
        Self {
            window,
            max_messages,
            hits: VecDeque::with_capacity(max_messages + 1),
        }
    }

    /// Record a message arriving at `now`. Returns `false` when the message
    /// exceeds the cap for the current window.
    pub fn check(&mut self, now: Instant) -> bool {
        while let Some(oldest) = self.hits.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }

        if self.hits.len() >= self.max_messages {
            return false;
        }
        self.hits.push_back(now);
        true
    }
}

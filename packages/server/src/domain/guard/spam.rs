//! Chat spam heuristics.

use std::{
    collections::{HashMap, VecDeque},
    sync::LazyLock,
};

use regex::Regex;
use thiserror::Error;

const MAX_UPPERCASE_RATIO: f64 = 0.7;
const MAX_CONSECUTIVE_REPEATS: usize = 10;
const MAX_EMOJI: usize = 10;
const FREQUENCY_WINDOW_MILLIS: i64 = 3_000;
const MAX_MESSAGES_PER_WINDOW: usize = 3;

static EMOJI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\p{Extended_Pictographic}").expect("invalid emoji pattern")
});

/// Why a chat message was refused. The message is shown to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpamReason {
    #[error("Message contains too many repeating characters")]
    RepeatingCharacters,

    #[error("Message contains too many capital letters")]
    ExcessiveCaps,

    #[error("Message contains too many emoji")]
    ExcessiveEmoji,

    #[error("You are sending messages too frequently")]
    TooFrequent,
}

/// Stateful spam checker for one room.
///
/// Content checks run first; the frequency check only counts messages that
/// were accepted. Send history is kept per author name for the length of the
/// window, whether or not the author is still connected.
#[derive(Debug, Default)]
pub struct SpamGuard {
    recent: HashMap<String, VecDeque<i64>>,
}

impl SpamGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Judge `message` from `author` at `now_millis`, recording it when accepted.
    pub fn check(&mut self, author: &str, message: &str, now_millis: i64) -> Result<(), SpamReason> {
        if longest_run(message) >= MAX_CONSECUTIVE_REPEATS {
            return Err(SpamReason::RepeatingCharacters);
        }
        if uppercase_ratio(message).is_some_and(|ratio| ratio > MAX_UPPERCASE_RATIO) {
            return Err(SpamReason::ExcessiveCaps);
        }
        if EMOJI_PATTERN.find_iter(message).count() > MAX_EMOJI {
            return Err(SpamReason::ExcessiveEmoji);
        }

        self.recent.retain(|_, sent| {
            sent.back()
                .is_some_and(|at| now_millis - *at < FREQUENCY_WINDOW_MILLIS)
        });
        let sent = self.recent.entry(author.to_string()).or_default();
        while sent
            .front()
            .is_some_and(|at| now_millis - *at >= FREQUENCY_WINDOW_MILLIS)
        {
            sent.pop_front();
        }
        if sent.len() >= MAX_MESSAGES_PER_WINDOW {
            return Err(SpamReason::TooFrequent);
        }
        sent.push_back(now_millis);
        Ok(())
    }

    /// Number of authors with sends still inside the frequency window.
    pub fn tracked_authors(&self) -> usize {
        self.recent.len()
    }
}

fn longest_run(message: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous = None;
    for c in message.chars() {
        if Some(c) == previous {
            current += 1;
        } else {
            current = 1;
            previous = Some(c);
        }
        longest = longest.max(current);
    }
    longest
}

fn uppercase_ratio(message: &str) -> Option<f64> {
    let letters: Vec<char> = message.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return None;
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    Some(upper as f64 / letters.len() as f64)
}

//! Per-session conversation history sent to the chat backend.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The connected client.
    User,
    /// The backend model.
    Model,
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Bounded history of completed exchanges.
///
/// Only whole exchanges are recorded: a failed or cancelled stream
/// leaves the history untouched.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: VecDeque<Turn>,
    max_turns: usize,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_TURNS)
    }
}

impl Conversation {
    /// Default turn cap.
    pub const DEFAULT_MAX_TURNS: usize = 20;

    /// Create an empty conversation keeping at most `max_turns` turns.
    #[must_use]
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    /// Prior turns, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    /// Record a finished prompt/reply exchange.
    ///
    /// Old exchanges are dropped whole, so history always opens with a
    /// user turn; an odd cap keeps one turn fewer.
    pub fn record(&mut self, prompt: impl Into<String>, reply: impl Into<String>) {
        self.turns.push_back(Turn::user(prompt));
        self.turns.push_back(Turn::model(reply));
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
            self.turns.pop_front();
        }
    }

    /// Number of stored turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

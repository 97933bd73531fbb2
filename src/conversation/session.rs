//! Conversation turn history

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Persona and instruction preamble
    System,
    /// The trainee speaking into the microphone
    User,
    /// The simulated customer (chat backend reply)
    Assistant,
}

impl Role {
    /// Wire name used by chat completion APIs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who said it
    pub role: Role,
    /// What was said
    pub content: String,
}

impl ConversationTurn {
    /// Create a system turn
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user turn
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only turn history for a single coaching conversation
///
/// The preamble (system turns installed at construction) is never mutated.
/// Once [`mark_ended`](Self::mark_ended) is called no further turns are accepted.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    turns: Vec<ConversationTurn>,
    preamble_len: usize,
    max_reply_tokens: u32,
    ended: bool,
}

impl ConversationSession {
    /// Create a session seeded with the given preamble turns
    #[must_use]
    pub fn new(preamble: Vec<ConversationTurn>, max_reply_tokens: u32) -> Self {
        let preamble_len = preamble.len();
        Self {
            turns: preamble,
            preamble_len,
            max_reply_tokens,
            ended: false,
        }
    }

    /// Append a user turn
    ///
    /// # Errors
    ///
    /// Returns [`Error::CallerMisuse`] if the session has ended
    pub fn append_user(&mut self, text: impl Into<String>) -> Result<()> {
        self.append(ConversationTurn::user(text))
    }

    /// Append an assistant turn
    ///
    /// # Errors
    ///
    /// Returns [`Error::CallerMisuse`] if the session has ended
    pub fn append_assistant(&mut self, text: impl Into<String>) -> Result<()> {
        self.append(ConversationTurn::assistant(text))
    }

    fn append(&mut self, turn: ConversationTurn) -> Result<()> {
        if self.ended {
            return Err(Error::CallerMisuse(format!(
                "{} turn appended after the conversation ended",
                turn.role
            )));
        }
        self.turns.push(turn);
        Ok(())
    }

    /// Full history to submit with the next chat request, preamble first
    #[must_use]
    pub fn snapshot_for_request(&self) -> Vec<ConversationTurn> {
        self.turns.clone()
    }

    /// Mark the conversation as ended (idempotent)
    pub const fn mark_ended(&mut self) {
        self.ended = true;
    }

    /// Whether the conversation has ended
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    /// Upper bound on tokens per assistant reply
    #[must_use]
    pub const fn max_reply_tokens(&self) -> u32 {
        self.max_reply_tokens
    }

    /// All turns in chronological order
    #[must_use]
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The persona preamble installed at construction
    #[must_use]
    pub fn preamble(&self) -> &[ConversationTurn] {
        &self.turns[..self.preamble_len]
    }

    /// Turns exchanged after the preamble
    #[must_use]
    pub fn exchanged(&self) -> &[ConversationTurn] {
        &self.turns[self.preamble_len..]
    }
}

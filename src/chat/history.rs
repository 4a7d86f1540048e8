//! Chat turns and the greeting-seeded conversation log.
//!
//! The conversation is an append-only list of [`ChatTurn`]s owned by the
//! controller. It is never empty: a fresh conversation carries the welcome
//! greeting, and clearing reseeds a single post-clear greeting. Rendering
//! layers read it through the [`Conversation::turns`] snapshot and never
//! mutate it directly.

use chrono::Local;

use crate::persona;

/// Speaker for a single chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Wire-format role name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One utterance in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    /// Wall-clock `HH:MM` stamp taken when the turn was created.
    pub timestamp: String,
}

impl ChatTurn {
    /// Create a turn stamped with the current local time.
    #[must_use]
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Local::now().format("%H:%M").to_string(),
        }
    }
}

/// Conversation log, oldest turn first.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Start a conversation seeded with the welcome greeting.
    #[must_use]
    pub fn new() -> Self {
        Self::with_greeting(persona::WELCOME_GREETING)
    }

    /// Start a conversation seeded with a specific greeting turn.
    #[must_use]
    pub fn with_greeting(text: impl Into<String>) -> Self {
        Self {
            turns: vec![ChatTurn::new(Role::Assistant, text)],
        }
    }

    /// Read-only snapshot of every turn.
    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Number of turns, counting the seed greeting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// True until the first turn beyond the seed greeting is appended.
    #[must_use]
    pub fn is_seed_only(&self) -> bool {
        self.turns.len() <= 1
    }

    /// The most recent turn.
    #[must_use]
    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    /// Append a user turn.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(ChatTurn::new(Role::User, text));
    }

    /// Append an assistant turn.
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.turns.push(ChatTurn::new(Role::Assistant, text));
    }

    /// Discard all history and reseed with the post-clear greeting.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.turns
            .push(ChatTurn::new(Role::Assistant, persona::CLEAR_GREETING));
    }
}

pub mod prediction;

pub use prediction::PredictionLabel;

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    /// Role name in the chat backend's vocabulary.
    pub fn backend_role(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "model",
        }
    }

    fn display_prefix(self) -> &'static str {
        match self {
            Role::User => "🧑‍💬 You:",
            Role::Bot => "🤖 Bot:",
        }
    }
}

/// One message exchanged between the user and the bot.
///
/// Fields are private so a turn cannot be edited once it is in a transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(Role::Bot, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_bot(&self) -> bool {
        self.role == Role::Bot
    }
}

/// Append-only, chronologically ordered history of a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Most recent turn produced by the bot, if any.
    pub fn last_bot(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.is_bot())
    }

    /// Display form: one block per turn, prefixed by the speaker.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{} {}", t.role.display_prefix(), t.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

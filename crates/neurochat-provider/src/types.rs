use neurochat_schema::Role;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role vocabulary understood by the chat backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendRole {
    User,
    Model,
}

impl BackendRole {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendRole::User => "user",
            BackendRole::Model => "model",
        }
    }
}

impl From<Role> for BackendRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => BackendRole::User,
            Role::Bot => BackendRole::Model,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendMessage {
    pub role: BackendRole,
    pub parts: Vec<String>,
}

impl BackendMessage {
    pub fn new(role: BackendRole, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![text.into()],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(BackendRole::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(BackendRole::Model, text)
    }

    pub fn text(&self) -> String {
        self.parts.join("\n")
    }
}

/// Ordered message list handed to a backend for one user turn.
///
/// Built fresh for every turn and never stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub messages: Vec<BackendMessage>,
}

impl ChatRequest {
    pub fn new(messages: Vec<BackendMessage>) -> Self {
        Self { messages }
    }

    /// First entry: the utterance being answered.
    pub fn head(&self) -> Option<&BackendMessage> {
        self.messages.first()
    }

    /// Everything after the head entry.
    pub fn history(&self) -> &[BackendMessage] {
        self.messages.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Every way a backend call can fail. Callers treat them all alike.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("no candidates in response")]
    EmptyResponse,
    #[error("invalid response payload: {0}")]
    Decode(String),
    #[error("provider misconfigured: {0}")]
    Config(String),
}

impl ChatError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Timeout | ChatError::Transport(_) => true,
            ChatError::Api { status, .. } => matches!(status, 429 | 500..=599),
            _ => false,
        }
    }
}

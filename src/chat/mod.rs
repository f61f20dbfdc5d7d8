pub mod backend;
pub mod links;
pub mod openai;
pub mod reveal;
pub mod terminal;
pub mod widget;

use serde::{Deserialize, Serialize};

pub use backend::{ChatBackend, ProxyChatBackend};
pub use widget::ChatWidget;

// ── Types ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage { role: Role::Assistant, content: content.into() }
    }
}

/// Conversation so far. Holds at most one system message, always first;
/// user and assistant turns follow in the order they happened.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    system: Option<ChatMessage>,
    turns: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_system(&self) -> bool {
        self.system.is_some()
    }

    /// Set the system prompt. Only the first call has any effect.
    pub fn set_system(&mut self, prompt: impl Into<String>) {
        if self.system.is_none() {
            self.system = Some(ChatMessage::system(prompt));
        }
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    /// Record a user turn unless it repeats the previous user turn verbatim,
    /// whether or not a reply came in between. Returns whether it was added.
    pub fn push_user(&mut self, text: &str) -> bool {
        if self.repeats_last_user(text) {
            return false;
        }
        self.turns.push(ChatMessage::user(text));
        true
    }

    pub fn push_assistant(&mut self, text: &str) {
        self.turns.push(ChatMessage::assistant(text));
    }

    fn repeats_last_user(&self, text: &str) -> bool {
        self.turns
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .is_some_and(|m| m.content == text)
    }

    /// True when the last recorded turn is this exact user message.
    fn is_pending(&self, text: &str) -> bool {
        matches!(self.turns.last(), Some(m) if m.role == Role::User && m.content == text)
    }

    /// Request payload for sending `text`: system, then prior turns, then
    /// this user turn exactly once.
    pub fn request_for(&self, text: &str) -> Vec<ChatMessage> {
        let prior = if self.is_pending(text) {
            &self.turns[..self.turns.len() - 1]
        } else {
            &self.turns[..]
        };
        self.system
            .iter()
            .cloned()
            .chain(prior.iter().cloned())
            .chain(std::iter::once(ChatMessage::user(text)))
            .collect()
    }

    /// Full transcript including the system message.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.system.iter().cloned().chain(self.turns.iter().cloned()).collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len() + usize::from(self.system.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatError {
    /// The request never got an answer.
    Network(String),
    /// The completion service answered with a non-2xx status.
    Upstream { status: u16, message: String },
    /// The answer held no assistant text.
    EmptyReply,
    /// Nothing to send.
    EmptyMessage,
    NotConfigured(String),
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatError::Network(e) => write!(f, "chat request failed: {}", e),
            ChatError::Upstream { status, message } => {
                write!(f, "chat service returned {}: {}", status, message)
            }
            ChatError::EmptyReply => write!(f, "chat service returned no reply"),
            ChatError::EmptyMessage => write!(f, "message is empty"),
            ChatError::NotConfigured(what) => write!(f, "{} not configured", what),
        }
    }
}

impl std::error::Error for ChatError {}

/// Bubble shown in place of a reply when a send fails.
pub const ERROR_BUBBLE: &str =
    "Le chatbot a rencontré un problème. Veuillez réessayer plus tard.";

/// Greeting shown when the widget opens.
pub const GREETING: &str =
    "Bonjour ! Je suis l'assistant virtuel. Comment puis-je vous aider ?";

/// Suggestions offered before the first message.
pub const PRESET_PHRASES: &[&str] = &[
    "Bonjour, qui es-tu ?",
    "Quelles sont tes compétences ?",
    "Comment te contacter ?",
    "Ton CV, Github, ou LinkedIn ?",
];

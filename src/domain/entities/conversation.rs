use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role-tagged transcript shown to the user. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_message(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
        self.updated_at = Utc::now();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    /// Speaker label used when rendering memory into a prompt.
    pub fn prompt_label(&self) -> &'static str {
        match self {
            Self::User => "Human",
            Self::Assistant => "AI",
        }
    }
}

/// Short-term memory fed back into every prompt.
///
/// Holds every completed exchange for the life of the session. Nothing is
/// evicted or summarized.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    messages: Vec<Message>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_turn(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.messages.push(Message::new(MessageRole::User, question));
        self.messages.push(Message::new(MessageRole::Assistant, answer));
    }

    pub fn turns(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn history_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role.prompt_label(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

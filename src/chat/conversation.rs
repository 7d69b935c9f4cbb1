//! Conversation thread type
//!
//! A conversation owns an ordered list of messages (append order is turn
//! order), its own model selection and generation settings, and the
//! timestamps the store maintains on every mutation.

use crate::api::{ApiMessage, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::chat::message::{derive_title, ChatMessage, MessageUpdate};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to freshly created (and cleared) conversations
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Per-conversation generation settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Completion token budget
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// An ordered thread of messages exchanged with the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Display title, auto-derived from the first user message
    pub title: String,
    /// Messages in append (turn) order
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Creation time
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    /// Model used for this thread
    #[serde(default = "default_model")]
    pub model: String,
    /// Generation settings for this thread
    #[serde(default)]
    pub settings: GenerationSettings,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Conversation {
    /// Creates an empty conversation
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::chat::Conversation;
    ///
    /// let conversation = Conversation::new("New Conversation", "minimax-m2");
    /// assert!(conversation.messages.is_empty());
    /// assert_eq!(conversation.model, "minimax-m2");
    /// ```
    pub fn new(title: impl Into<String>, model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            model: model.into(),
            settings: GenerationSettings::default(),
        }
    }

    /// Appends a message, maintaining title and `updated_at`
    ///
    /// When this is the conversation's first message and it is a user
    /// turn, the title is derived from its content (truncated to 50
    /// characters plus an ellipsis).
    pub fn add_message(&mut self, message: ChatMessage) -> Uuid {
        let id = message.id;
        let derive = self.messages.is_empty() && message.role == crate::api::Role::User;
        if derive {
            self.title = derive_title(&message.content);
        }
        self.messages.push(message);
        self.updated_at = Utc::now();
        id
    }

    /// Removes a message by id, preserving the order of the rest
    ///
    /// Returns `true` if a message was removed; unknown ids are a no-op.
    pub fn remove_message(&mut self, id: Uuid) -> bool {
        let before = self.messages.len();
        self.messages.retain(|msg| msg.id != id);
        let removed = self.messages.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Applies a partial update to a message by id
    ///
    /// Returns `true` on success; unknown ids are a no-op.
    pub fn update_message(&mut self, id: Uuid, updates: MessageUpdate) -> bool {
        let Some(message) = self.messages.iter_mut().find(|msg| msg.id == id) else {
            return false;
        };
        if let Some(content) = updates.content {
            message.content = content;
        }
        if let Some(role) = updates.role {
            message.role = role;
        }
        self.updated_at = Utc::now();
        true
    }

    /// Finds a message by id
    pub fn find_message(&self, id: Uuid) -> Option<&ChatMessage> {
        self.messages.iter().find(|msg| msg.id == id)
    }

    /// Empties the message list and resets the title
    pub fn clear(&mut self) {
        self.messages.clear();
        self.title = DEFAULT_TITLE.to_string();
        self.updated_at = Utc::now();
    }

    /// Deep-copies this conversation under a new identity
    ///
    /// Every message gets a fresh id; the title gains a " (Copy)"
    /// suffix and both timestamps are reset.
    pub fn duplicate(&self) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: format!("{} (Copy)", self.title),
            messages: self
                .messages
                .iter()
                .map(|msg| ChatMessage {
                    id: Uuid::new_v4(),
                    ..msg.clone()
                })
                .collect(),
            created_at: now,
            updated_at: now,
            model: self.model.clone(),
            settings: self.settings,
        }
    }

    /// Projects the messages down to canonical role/content pairs
    pub fn history(&self) -> Vec<ApiMessage> {
        self.messages
            .iter()
            .map(|msg| ApiMessage {
                role: msg.role,
                content: msg.content.clone(),
            })
            .collect()
    }
}

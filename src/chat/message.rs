//! Chat message type and helpers

use crate::api::Role;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of an auto-derived conversation title
pub(crate) const TITLE_MAX_CHARS: usize = 50;

/// A single message inside a conversation
///
/// Messages belong to exactly one conversation and are only mutated
/// through the store's update operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Author of this message
    pub role: Role,
    /// Text content
    pub content: String,
    /// Creation time
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a message with a fresh id and the current timestamp
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::api::Role;
    /// use colloquy::chat::ChatMessage;
    ///
    /// let msg = ChatMessage::user("Hello, assistant!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Partial update applied to an existing message
///
/// Unset fields leave the message untouched.
#[derive(Debug, Clone, Default)]
pub struct MessageUpdate {
    /// Replacement content
    pub content: Option<String>,
    /// Replacement role
    pub role: Option<Role>,
}

impl MessageUpdate {
    /// Update that replaces only the content
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            role: None,
        }
    }
}

/// Derive a conversation title from its first user message
///
/// Truncates to 50 characters plus an ellipsis when the content is
/// longer; shorter content is used verbatim.
pub(crate) fn derive_title(content: &str) -> String {
    let count = content.chars().count();
    if count > TITLE_MAX_CHARS {
        let mut title: String = content.chars().take(TITLE_MAX_CHARS).collect();
        title.push_str("...");
        title
    } else {
        content.to_string()
    }
}

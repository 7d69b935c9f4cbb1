//! Conversation management for Colloquy
//!
//! This module owns the chat domain model: messages, conversation
//! threads, and the store that holds the whole collection plus the
//! current-thread pointer.

pub mod conversation;
pub mod message;
pub mod store;

pub use conversation::{Conversation, GenerationSettings};
pub use message::{ChatMessage, MessageUpdate};
pub use store::{ChatStore, MessageStats, SearchMatch, SendOptions, StoreDefaults};

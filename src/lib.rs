//! Colloquy - terminal chat client library
//!
//! This library provides the core functionality for the Colloquy chat
//! client: conversation management, backend response normalization,
//! streaming adaptation, settings, local persistence, and export/import.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: Canonical request/response types and the chat service
//! - `transport`: The three request paths behind one trait, plus SSE
//! - `chat`: Messages, conversations, and the conversation store
//! - `settings`: The flat settings record with validation
//! - `storage`: Local key-value persistence
//! - `export`: Conversation export/import in JSON, text, and Markdown
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use colloquy::api::{ApiConfig, ChatService};
//! use colloquy::chat::{ChatStore, SendOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut store = ChatStore::new();
//!     store.set_service(ChatService::new(ApiConfig {
//!         api_key: "sk-...".to_string(),
//!         base_url: "https://api.minimax.chat/v1".to_string(),
//!         preferred: None,
//!     })?);
//!     store.initialize();
//!
//!     let reply = store.send_message("Hello!", SendOptions::default()).await?;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod error;
pub mod export;
pub mod settings;
pub mod storage;
pub mod transport;

// Re-export commonly used types
pub use api::{ApiConfig, CanonicalResponse, ChatService, FinishReason, Role, StreamEvent};
pub use chat::{ChatMessage, ChatStore, Conversation, SendOptions};
pub use error::{ColloquyError, Result};
pub use export::ExportFormat;
pub use settings::{Settings, SettingsStore};
pub use storage::LocalStore;

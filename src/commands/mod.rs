/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`     — Interactive chat session (REPL)
- `models`   — Model listing and account lookup
- `history`  — Stored-conversation management
- `transfer` — Conversation export/import
- `settings_cmd` — Settings inspection and changes

The handlers are intentionally small and use the library components:
the chat store, the settings store, the chat service, and the export
utilities.
*/

use crate::chat::{ChatStore, StoreDefaults};
use crate::chat::conversation::GenerationSettings;
use crate::error::Result;
use crate::settings::SettingsStore;
use crate::storage::LocalStore;

pub mod chat;
pub mod history;
pub mod models;
pub mod settings_cmd;
pub mod special;
pub mod transfer;

/// Open storage and load the settings store
pub(crate) fn load_settings_store() -> Result<SettingsStore> {
    let storage = LocalStore::new()?;
    let mut store = SettingsStore::new();
    store.set_storage(storage);
    store.load_settings();
    Ok(store)
}

/// Open storage and load the conversation store, seeded with defaults
/// from the given settings store
pub(crate) fn load_chat_store(settings: &SettingsStore) -> Result<ChatStore> {
    let storage = LocalStore::new()?;
    let mut store = ChatStore::new();
    store.set_storage(storage);
    store.set_defaults(StoreDefaults {
        model: settings.settings().default_model.clone(),
        settings: GenerationSettings {
            temperature: settings.settings().temperature,
            max_tokens: settings.settings().max_tokens,
        },
    });
    store.load_conversations();
    Ok(store)
}

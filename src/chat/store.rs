//! The conversation store
//!
//! Owns the collection of conversation threads, the current-thread
//! pointer, the loading/error flags, and every mutation operation. All
//! operations take `&mut self`, so two sends can never interleave on the
//! same conversation; callers that need shared access (the interactive
//! REPL and its autosave task) wrap the store in an async mutex.

use crate::api::{ApiMessage, CanonicalResponse, ChatRequest, ChatService, Role, DEFAULT_MODEL};
use crate::chat::conversation::{Conversation, GenerationSettings, DEFAULT_TITLE};
use crate::chat::message::{ChatMessage, MessageUpdate};
use crate::error::{ColloquyError, Result};
use crate::export::conversation_snapshot;
use crate::storage::{LocalStore, CONVERSATIONS_KEY};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Defaults applied to freshly created conversations
#[derive(Debug, Clone)]
pub struct StoreDefaults {
    /// Model for new conversations
    pub model: String,
    /// Generation settings for new conversations
    pub settings: GenerationSettings,
}

impl Default for StoreDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            settings: GenerationSettings::default(),
        }
    }
}

/// Per-call overrides for `send_message`
///
/// An explicit option wins over the conversation's own defaults.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Model override
    pub model: Option<String>,
    /// Token budget override
    pub max_tokens: Option<u32>,
    /// Temperature override
    pub temperature: Option<f64>,
}

/// One hit returned by `search_messages`
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    /// Conversation the hit belongs to
    pub conversation_id: Uuid,
    /// Its title at search time
    pub conversation_title: String,
    /// The matching message's id
    pub message_id: Uuid,
    /// The matching message
    pub message: ChatMessage,
    /// The matched content
    pub matched: String,
}

/// Aggregate counts over the whole collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageStats {
    /// Number of conversations
    pub total_conversations: usize,
    /// Number of messages across all conversations
    pub total_messages: usize,
    /// Number of user messages
    pub user_messages: usize,
    /// Number of assistant messages
    pub assistant_messages: usize,
    /// Rounded average messages per conversation
    pub average_messages_per_conversation: usize,
}

/// Persisted shape of the whole collection
#[derive(Debug, Serialize, Deserialize)]
struct ConversationsRecord {
    conversations: Vec<Conversation>,
    current_conversation_id: Option<Uuid>,
    #[serde(default)]
    last_saved: Option<DateTime<Utc>>,
}

/// The conversation store
pub struct ChatStore {
    conversations: Vec<Conversation>,
    current_id: Option<Uuid>,
    is_loading: bool,
    last_error: Option<String>,
    defaults: StoreDefaults,
    service: Option<ChatService>,
    storage: Option<LocalStore>,
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatStore {
    /// Creates an empty, in-memory store
    ///
    /// Attach persistence with [`ChatStore::set_storage`] and a
    /// configured service with [`ChatStore::set_service`].
    pub fn new() -> Self {
        Self {
            conversations: Vec::new(),
            current_id: None,
            is_loading: false,
            last_error: None,
            defaults: StoreDefaults::default(),
            service: None,
            storage: None,
        }
    }

    /// Attach the local key-value store used by load/save
    pub fn set_storage(&mut self, storage: LocalStore) {
        self.storage = Some(storage);
    }

    /// Attach the chat service used by send/retry
    pub fn set_service(&mut self, service: ChatService) {
        self.service = Some(service);
    }

    /// The attached chat service, if any
    pub fn service(&self) -> Option<&ChatService> {
        self.service.as_ref()
    }

    /// Set the defaults applied to new conversations
    pub fn set_defaults(&mut self, defaults: StoreDefaults) {
        self.defaults = defaults;
    }

    /// All conversations, most recently created first
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Whether a request is in flight
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// The last recorded request error, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Id of the current conversation
    pub fn current_id(&self) -> Option<Uuid> {
        self.current_id
    }

    /// The current conversation, if one is set
    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.current_id
            .and_then(|id| self.conversations.iter().find(|c| c.id == id))
    }

    fn current_conversation_mut(&mut self) -> Option<&mut Conversation> {
        let id = self.current_id?;
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    /// Look up a conversation by id
    pub fn conversation(&self, id: Uuid) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Resolve a conversation id from a (possibly partial) id string
    ///
    /// Accepts a full UUID or a prefix of its hyphenated form.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<Uuid> {
        self.conversations
            .iter()
            .find(|c| c.id.to_string().starts_with(prefix))
            .map(|c| c.id)
    }

    /// Creates a new conversation, prepends it, and makes it current
    ///
    /// Always succeeds.
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::chat::ChatStore;
    ///
    /// let mut store = ChatStore::new();
    /// let id = store.create_new_conversation(None);
    /// assert_eq!(store.current_id(), Some(id));
    /// assert_eq!(store.conversations().len(), 1);
    /// ```
    pub fn create_new_conversation(&mut self, title: Option<&str>) -> Uuid {
        let mut conversation =
            Conversation::new(title.unwrap_or(DEFAULT_TITLE), &self.defaults.model);
        conversation.settings = self.defaults.settings;
        let id = conversation.id;
        self.conversations.insert(0, conversation);
        self.current_id = Some(id);
        id
    }

    /// Sets the current pointer iff a conversation with `id` exists
    ///
    /// Unknown ids are a silent no-op.
    pub fn set_current_conversation(&mut self, id: Uuid) {
        if self.conversations.iter().any(|c| c.id == id) {
            self.current_id = Some(id);
        }
    }

    fn ensure_current(&mut self) {
        if self.current_conversation().is_none() {
            self.create_new_conversation(None);
        }
    }

    /// Appends a message to the current conversation
    ///
    /// Creates a conversation first when none is current. Returns the
    /// message id.
    pub fn add_message(&mut self, message: ChatMessage) -> Uuid {
        self.ensure_current();
        match self.current_conversation_mut() {
            Some(conversation) => conversation.add_message(message),
            // Unreachable after ensure_current; keep the id stable anyway.
            None => message.id,
        }
    }

    /// Removes a message from the current conversation by id
    pub fn remove_message(&mut self, id: Uuid) -> bool {
        self.current_conversation_mut()
            .map(|c| c.remove_message(id))
            .unwrap_or(false)
    }

    /// Applies a partial update to a message in the current conversation
    pub fn update_message(&mut self, id: Uuid, updates: MessageUpdate) -> bool {
        self.current_conversation_mut()
            .map(|c| c.update_message(id, updates))
            .unwrap_or(false)
    }

    /// Sends a user turn and returns the assistant's reply text
    ///
    /// Appends the user message (deriving the title on a first turn),
    /// issues a non-streaming request with resolved model/token/
    /// temperature (explicit option overrides the conversation's
    /// defaults), appends the assistant reply, and returns its text.
    ///
    /// The loading flag is set for the duration and always cleared; the
    /// last error message is recorded before a failure is rethrown.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no service is attached, and
    /// propagates request/network errors from the service.
    pub async fn send_message(&mut self, content: &str, options: SendOptions) -> Result<String> {
        self.ensure_current();
        self.is_loading = true;
        self.last_error = None;

        let result = self.dispatch_user_turn(content, &options).await;

        self.is_loading = false;
        if let Err(error) = &result {
            self.last_error = Some(error.to_string());
        }
        result
    }

    async fn dispatch_user_turn(&mut self, content: &str, options: &SendOptions) -> Result<String> {
        let (history, model, max_tokens, temperature) = match self.current_conversation_mut() {
            Some(conversation) => {
                conversation.add_message(ChatMessage::user(content));
                (
                    conversation.history(),
                    options
                        .model
                        .clone()
                        .unwrap_or_else(|| conversation.model.clone()),
                    options.max_tokens.unwrap_or(conversation.settings.max_tokens),
                    options
                        .temperature
                        .unwrap_or(conversation.settings.temperature),
                )
            }
            None => {
                return Err(ColloquyError::Config("no current conversation".to_string()).into())
            }
        };

        let response = self
            .request_completion(history, model, max_tokens, temperature)
            .await?;

        let reply = response.content.clone();
        if let Some(conversation) = self.current_conversation_mut() {
            conversation.add_message(ChatMessage::assistant(response.content));
        }
        Ok(reply)
    }

    async fn request_completion(
        &self,
        messages: Vec<ApiMessage>,
        model: String,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<CanonicalResponse> {
        let service = self.service.as_ref().ok_or_else(|| {
            ColloquyError::Config("chat service is not configured".to_string())
        })?;
        let mut request = ChatRequest::new(model, messages);
        request.max_tokens = max_tokens;
        request.temperature = temperature;
        service.send(&request).await
    }

    /// Replays a user message
    ///
    /// Locates a user message in the current conversation, deletes every
    /// assistant message strictly between it and the next user message
    /// (or the end of the list), re-issues the request from the history
    /// truncated at the target message, and appends exactly one new
    /// assistant reply. The user turn is not duplicated.
    ///
    /// Returns `Ok(None)` when the id does not name a user message in
    /// the current conversation.
    pub async fn retry_message(&mut self, id: Uuid) -> Result<Option<String>> {
        let prepared = {
            let Some(conversation) = self.current_conversation_mut() else {
                return Ok(None);
            };
            let Some(index) = conversation.messages.iter().position(|m| m.id == id) else {
                return Ok(None);
            };
            if conversation.messages[index].role != Role::User {
                return Ok(None);
            }

            let stale: Vec<Uuid> = conversation.messages[index + 1..]
                .iter()
                .take_while(|m| m.role != Role::User)
                .filter(|m| m.role == Role::Assistant)
                .map(|m| m.id)
                .collect();
            for stale_id in stale {
                conversation.remove_message(stale_id);
            }

            let history: Vec<ApiMessage> = conversation.messages[..=index]
                .iter()
                .map(|m| ApiMessage {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect();
            (
                history,
                conversation.model.clone(),
                conversation.settings.max_tokens,
                conversation.settings.temperature,
            )
        };

        self.is_loading = true;
        self.last_error = None;
        let result = self
            .request_completion(prepared.0, prepared.1, prepared.2, prepared.3)
            .await;
        self.is_loading = false;

        match result {
            Ok(response) => {
                let reply = response.content.clone();
                if let Some(conversation) = self.current_conversation_mut() {
                    conversation.add_message(ChatMessage::assistant(response.content));
                }
                Ok(Some(reply))
            }
            Err(error) => {
                self.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    /// Empties the current conversation and resets its title
    pub fn clear_current_conversation(&mut self) {
        if let Some(conversation) = self.current_conversation_mut() {
            conversation.clear();
        }
    }

    /// Deletes a conversation
    ///
    /// When the current conversation is deleted, the pointer moves to
    /// the new first conversation, or a fresh conversation is created if
    /// none remain. Returns `false` for unknown ids.
    pub fn delete_conversation(&mut self, id: Uuid) -> bool {
        let Some(index) = self.conversations.iter().position(|c| c.id == id) else {
            return false;
        };
        self.conversations.remove(index);

        if self.current_id == Some(id) {
            match self.conversations.first() {
                Some(first) => self.current_id = Some(first.id),
                None => {
                    self.current_id = None;
                    self.create_new_conversation(None);
                }
            }
        }
        true
    }

    /// Deep-copies a conversation under a new identity
    ///
    /// All messages get fresh ids; the copy is prepended with a
    /// " (Copy)" title suffix. Returns the new id, or `None` for
    /// unknown ids.
    pub fn duplicate_conversation(&mut self, id: Uuid) -> Option<Uuid> {
        let copy = self.conversation(id)?.duplicate();
        let copy_id = copy.id;
        self.conversations.insert(0, copy);
        Some(copy_id)
    }

    /// Merges generation overrides into the current conversation
    pub fn update_conversation_settings(
        &mut self,
        temperature: Option<f64>,
        max_tokens: Option<u32>,
        model: Option<String>,
    ) {
        if let Some(conversation) = self.current_conversation_mut() {
            if let Some(temperature) = temperature {
                conversation.settings.temperature = temperature;
            }
            if let Some(max_tokens) = max_tokens {
                conversation.settings.max_tokens = max_tokens;
            }
            if let Some(model) = model {
                conversation.model = model;
            }
            conversation.updated_at = Utc::now();
        }
    }

    /// Produces a JSON snapshot of one conversation
    ///
    /// Returns `None` for unknown ids.
    pub fn export_conversation(&self, id: Uuid) -> Option<Value> {
        self.conversation(id).map(conversation_snapshot)
    }

    /// Produces a JSON snapshot of the whole collection
    pub fn export_all_conversations(&self) -> Value {
        serde_json::json!({
            "conversations": self.conversations,
            "exported_at": Utc::now(),
            "version": "1.0.0",
            "count": self.conversations.len(),
        })
    }

    /// Imports a conversation snapshot
    ///
    /// Validates the presence of a message array, assigns missing
    /// ids/timestamps, and prepends the rebuilt conversation under a
    /// fresh id. Returns the new id.
    ///
    /// # Errors
    ///
    /// Returns a malformed-data error when the snapshot has no message
    /// array or a message cannot be parsed.
    pub fn import_conversation(&mut self, data: &Value) -> Result<Uuid> {
        let message_values = data
            .get("messages")
            .and_then(|m| m.as_array())
            .ok_or_else(|| {
                ColloquyError::Malformed("conversation data has no messages array".to_string())
            })?;

        let messages: Vec<ChatMessage> = message_values
            .iter()
            .map(|value| serde_json::from_value(value.clone()))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| {
                ColloquyError::Malformed(format!("invalid message in conversation data: {}", e))
            })?;

        let title = data
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or("Imported Conversation");
        let model = data
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(&self.defaults.model)
            .to_string();

        let mut conversation = Conversation::new(title, model);
        if let Some(settings) = data.get("settings") {
            if let Ok(settings) = serde_json::from_value::<GenerationSettings>(settings.clone()) {
                conversation.settings = settings;
            }
        }
        conversation.messages = messages;

        let id = conversation.id;
        self.conversations.insert(0, conversation);
        Ok(id)
    }

    /// Case-insensitive substring search across all conversations
    ///
    /// An empty or whitespace query returns no results.
    pub fn search_messages(&self, query: &str) -> Vec<SearchMatch> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let term = query.to_lowercase();

        let mut results = Vec::new();
        for conversation in &self.conversations {
            for message in &conversation.messages {
                if message.content.to_lowercase().contains(&term) {
                    results.push(SearchMatch {
                        conversation_id: conversation.id,
                        conversation_title: conversation.title.clone(),
                        message_id: message.id,
                        message: message.clone(),
                        matched: message.content.clone(),
                    });
                }
            }
        }
        results
    }

    /// Aggregate counts over the whole collection
    pub fn message_stats(&self) -> MessageStats {
        let total_messages: usize = self.conversations.iter().map(|c| c.messages.len()).sum();
        let user_messages: usize = self
            .conversations
            .iter()
            .map(|c| c.messages.iter().filter(|m| m.role == Role::User).count())
            .sum();
        let assistant_messages: usize = self
            .conversations
            .iter()
            .map(|c| {
                c.messages
                    .iter()
                    .filter(|m| m.role == Role::Assistant)
                    .count()
            })
            .sum();
        let total_conversations = self.conversations.len();
        let average = if total_conversations > 0 {
            (total_messages as f64 / total_conversations as f64).round() as usize
        } else {
            0
        };

        MessageStats {
            total_conversations,
            total_messages,
            user_messages,
            assistant_messages,
            average_messages_per_conversation: average,
        }
    }

    /// Loads the collection from the attached storage
    ///
    /// Missing storage or a missing record leaves the store untouched;
    /// read/parse failures reset to the empty state rather than
    /// propagating.
    pub fn load_conversations(&mut self) {
        match self.try_load() {
            Ok(true) => {
                tracing::debug!("loaded {} conversations", self.conversations.len());
            }
            Ok(false) => {}
            Err(error) => {
                tracing::error!("failed to load conversations, resetting: {}", error);
                self.conversations.clear();
                self.current_id = None;
            }
        }
    }

    fn try_load(&mut self) -> Result<bool> {
        let Some(storage) = &self.storage else {
            return Ok(false);
        };
        let Some(serialized) = storage.get(CONVERSATIONS_KEY)? else {
            return Ok(false);
        };
        let record: ConversationsRecord = serde_json::from_str(&serialized)?;
        self.conversations = record.conversations;
        self.current_id = record
            .current_conversation_id
            .filter(|id| self.conversations.iter().any(|c| c.id == *id));
        Ok(true)
    }

    /// Saves the collection to the attached storage
    ///
    /// Best-effort: failures are logged and never propagated.
    pub fn save_conversations(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        let record = ConversationsRecord {
            conversations: self.conversations.clone(),
            current_conversation_id: self.current_id,
            last_saved: Some(Utc::now()),
        };
        match serde_json::to_string(&record) {
            Ok(json) => {
                if let Err(error) = storage.put(CONVERSATIONS_KEY, &json) {
                    tracing::error!("failed to save conversations: {}", error);
                }
            }
            Err(error) => {
                tracing::error!("failed to serialize conversations: {}", error);
            }
        }
    }

    /// First-use contract
    ///
    /// Creates a conversation when none exist; otherwise defaults the
    /// current pointer to the first conversation when unset.
    pub fn initialize(&mut self) {
        if self.conversations.is_empty() {
            self.create_new_conversation(None);
        } else if self.current_id.is_none() {
            self.current_id = self.conversations.first().map(|c| c.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_with_storage() -> (ChatStore, tempfile::TempDir) {
        let dir = tempdir().expect("tempdir");
        let storage =
            LocalStore::new_with_path(dir.path().join("colloquy.db")).expect("storage");
        let mut store = ChatStore::new();
        store.set_storage(storage);
        (store, dir)
    }

    #[test]
    fn test_initialize_creates_one_current_conversation() {
        let mut store = ChatStore::new();
        store.initialize();
        assert_eq!(store.conversations().len(), 1);
        assert!(store.current_id().is_some());
        assert_eq!(store.current_conversation().unwrap().title, DEFAULT_TITLE);
    }

    #[test]
    fn test_initialize_defaults_current_to_first() {
        let mut store = ChatStore::new();
        let first = store.create_new_conversation(Some("a"));
        let second = store.create_new_conversation(Some("b"));
        store.current_id = None;

        store.initialize();
        // "b" was prepended, so it is the first conversation.
        assert_eq!(store.current_id(), Some(second));
        assert_ne!(store.current_id(), Some(first));
        assert_eq!(store.conversations().len(), 2);
    }

    #[test]
    fn test_create_new_conversation_prepends_and_sets_current() {
        let mut store = ChatStore::new();
        let first = store.create_new_conversation(None);
        let second = store.create_new_conversation(Some("newer"));
        assert_eq!(store.conversations()[0].id, second);
        assert_eq!(store.conversations()[1].id, first);
        assert_eq!(store.current_id(), Some(second));
    }

    #[test]
    fn test_set_current_conversation_unknown_id_is_noop() {
        let mut store = ChatStore::new();
        let id = store.create_new_conversation(None);
        store.set_current_conversation(Uuid::new_v4());
        assert_eq!(store.current_id(), Some(id));
    }

    #[test]
    fn test_add_message_creates_conversation_when_none() {
        let mut store = ChatStore::new();
        store.add_message(ChatMessage::user("bootstrap"));
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.current_conversation().unwrap().messages.len(), 1);
        assert_eq!(store.current_conversation().unwrap().title, "bootstrap");
    }

    #[test]
    fn test_remove_message_without_current_is_noop() {
        let mut store = ChatStore::new();
        assert!(!store.remove_message(Uuid::new_v4()));
    }

    #[test]
    fn test_update_message_on_current_conversation() {
        let mut store = ChatStore::new();
        let id = store.add_message(ChatMessage::user("draft"));
        assert!(store.update_message(id, MessageUpdate::content("edited")));
        assert_eq!(
            store.current_conversation().unwrap().messages[0].content,
            "edited"
        );
    }

    #[test]
    fn test_delete_conversation_switches_current_to_first() {
        let mut store = ChatStore::new();
        let old = store.create_new_conversation(Some("old"));
        let newer = store.create_new_conversation(Some("newer"));
        store.set_current_conversation(old);

        assert!(store.delete_conversation(old));
        assert_eq!(store.current_id(), Some(newer));
        assert_eq!(store.conversations().len(), 1);
    }

    #[test]
    fn test_delete_last_conversation_creates_fresh_one() {
        let mut store = ChatStore::new();
        let only = store.create_new_conversation(None);
        assert!(store.delete_conversation(only));

        // A current conversation always exists afterwards.
        assert_eq!(store.conversations().len(), 1);
        assert!(store.current_id().is_some());
        assert_ne!(store.current_id(), Some(only));
    }

    #[test]
    fn test_delete_non_current_keeps_pointer() {
        let mut store = ChatStore::new();
        let old = store.create_new_conversation(Some("old"));
        let newer = store.create_new_conversation(Some("newer"));

        assert!(store.delete_conversation(old));
        assert_eq!(store.current_id(), Some(newer));
    }

    #[test]
    fn test_delete_unknown_conversation_returns_false() {
        let mut store = ChatStore::new();
        store.create_new_conversation(None);
        assert!(!store.delete_conversation(Uuid::new_v4()));
    }

    #[test]
    fn test_duplicate_conversation_prepends_copy() {
        let mut store = ChatStore::new();
        let id = store.create_new_conversation(None);
        store.add_message(ChatMessage::user("original"));

        let copy_id = store.duplicate_conversation(id).unwrap();
        assert_eq!(store.conversations().len(), 2);
        assert_eq!(store.conversations()[0].id, copy_id);
        assert_eq!(store.conversations()[0].title, "original (Copy)");
        assert_ne!(
            store.conversations()[0].messages[0].id,
            store.conversations()[1].messages[0].id
        );
        // Duplication does not steal the current pointer.
        assert_eq!(store.current_id(), Some(id));
    }

    #[test]
    fn test_clear_current_conversation_resets_title() {
        let mut store = ChatStore::new();
        store.add_message(ChatMessage::user("sets title"));
        store.clear_current_conversation();
        let conversation = store.current_conversation().unwrap();
        assert!(conversation.messages.is_empty());
        assert_eq!(conversation.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_update_conversation_settings_merges() {
        let mut store = ChatStore::new();
        store.create_new_conversation(None);
        store.update_conversation_settings(Some(1.2), None, Some("minimax-m2-stable".into()));

        let conversation = store.current_conversation().unwrap();
        assert_eq!(conversation.settings.temperature, 1.2);
        assert_eq!(conversation.settings.max_tokens, 2048);
        assert_eq!(conversation.model, "minimax-m2-stable");
    }

    #[test]
    fn test_search_messages_case_insensitive() {
        let mut store = ChatStore::new();
        store.create_new_conversation(Some("first"));
        store.add_message(ChatMessage::user("Rust borrow checker"));
        store.create_new_conversation(Some("second"));
        store.add_message(ChatMessage::assistant("the BORROW rules say"));

        let results = store.search_messages("borrow");
        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|r| r.matched.contains("checker")));
    }

    #[test]
    fn test_search_messages_empty_query_returns_empty() {
        let mut store = ChatStore::new();
        store.add_message(ChatMessage::user("anything"));
        assert!(store.search_messages("").is_empty());
        assert!(store.search_messages("   ").is_empty());
    }

    #[test]
    fn test_message_stats() {
        let mut store = ChatStore::new();
        store.create_new_conversation(None);
        store.add_message(ChatMessage::user("q1"));
        store.add_message(ChatMessage::assistant("a1"));
        store.create_new_conversation(None);
        store.add_message(ChatMessage::user("q2"));

        let stats = store.message_stats();
        assert_eq!(stats.total_conversations, 2);
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.user_messages, 2);
        assert_eq!(stats.assistant_messages, 1);
        // 3 / 2 = 1.5, rounds to 2.
        assert_eq!(stats.average_messages_per_conversation, 2);
    }

    #[test]
    fn test_message_stats_empty_store() {
        let store = ChatStore::new();
        let stats = store.message_stats();
        assert_eq!(stats.total_conversations, 0);
        assert_eq!(stats.average_messages_per_conversation, 0);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let mut store = ChatStore::new();
        let id = store.create_new_conversation(None);
        store.add_message(ChatMessage::user("persist this"));
        store.add_message(ChatMessage::assistant("stored"));
        store.update_conversation_settings(Some(0.3), Some(512), None);

        let snapshot = store.export_conversation(id).unwrap();
        let imported_id = store.import_conversation(&snapshot).unwrap();

        let original = store.conversation(id).unwrap().clone();
        let imported = store.conversation(imported_id).unwrap();
        assert_ne!(imported.id, original.id);
        assert_eq!(imported.title, original.title);
        assert_eq!(imported.model, original.model);
        assert_eq!(imported.settings, original.settings);
        assert_eq!(imported.messages.len(), original.messages.len());
        for (a, b) in imported.messages.iter().zip(original.messages.iter()) {
            assert_eq!(a.role, b.role);
            assert_eq!(a.content, b.content);
        }
    }

    #[test]
    fn test_import_conversation_without_messages_fails() {
        let mut store = ChatStore::new();
        let result = store.import_conversation(&serde_json::json!({"title": "broken"}));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("no messages array"));
    }

    #[test]
    fn test_import_conversation_fills_missing_ids_and_timestamps() {
        let mut store = ChatStore::new();
        let data = serde_json::json!({
            "messages": [
                {"role": "user", "content": "bare"},
                {"role": "assistant", "content": "also bare"}
            ]
        });
        let id = store.import_conversation(&data).unwrap();
        let imported = store.conversation(id).unwrap();
        assert_eq!(imported.title, "Imported Conversation");
        assert_eq!(imported.messages.len(), 2);
        assert!(!imported.messages[0].id.is_nil());
    }

    #[test]
    fn test_export_all_conversations_envelope() {
        let mut store = ChatStore::new();
        store.create_new_conversation(None);
        store.create_new_conversation(None);

        let bulk = store.export_all_conversations();
        assert_eq!(bulk["count"], 2);
        assert!(bulk["conversations"].is_array());
        assert_eq!(bulk["version"], "1.0.0");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (mut store, dir) = store_with_storage();
        let id = store.create_new_conversation(Some("saved"));
        store.add_message(ChatMessage::user("remember me"));
        store.save_conversations();

        let storage = LocalStore::new_with_path(dir.path().join("colloquy.db")).unwrap();
        let mut reloaded = ChatStore::new();
        reloaded.set_storage(storage);
        reloaded.load_conversations();

        assert_eq!(reloaded.conversations().len(), 1);
        assert_eq!(reloaded.current_id(), Some(id));
        assert_eq!(reloaded.conversations()[0].messages[0].content, "remember me");
    }

    #[test]
    fn test_load_corrupt_record_resets_to_empty() {
        let (mut store, _dir) = store_with_storage();
        store
            .storage
            .as_ref()
            .unwrap()
            .put(CONVERSATIONS_KEY, "{not json")
            .unwrap();
        store.create_new_conversation(None);

        store.load_conversations();
        assert!(store.conversations().is_empty());
        assert!(store.current_id().is_none());
    }

    #[test]
    fn test_load_without_record_keeps_state() {
        let (mut store, _dir) = store_with_storage();
        store.create_new_conversation(None);
        store.load_conversations();
        assert_eq!(store.conversations().len(), 1);
    }

    #[test]
    fn test_find_by_prefix() {
        let mut store = ChatStore::new();
        let id = store.create_new_conversation(None);
        let prefix = &id.to_string()[..8];
        assert_eq!(store.find_by_prefix(prefix), Some(id));
        assert_eq!(store.find_by_prefix("zzzzzzzz"), None);
    }

    #[tokio::test]
    async fn test_send_message_without_service_records_error() {
        let mut store = ChatStore::new();
        let result = store.send_message("hello", SendOptions::default()).await;
        assert!(result.is_err());
        assert!(!store.is_loading());
        assert!(store
            .last_error()
            .unwrap()
            .contains("chat service is not configured"));
        // The user turn was still appended before dispatch failed.
        assert_eq!(store.current_conversation().unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn test_retry_message_unknown_id_is_noop() {
        let mut store = ChatStore::new();
        store.add_message(ChatMessage::user("hi"));
        let result = store.retry_message(Uuid::new_v4()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_retry_message_rejects_assistant_target() {
        let mut store = ChatStore::new();
        let id = store.add_message(ChatMessage::assistant("not retryable"));
        let result = store.retry_message(id).await.unwrap();
        assert!(result.is_none());
        assert_eq!(store.current_conversation().unwrap().messages.len(), 1);
    }
}

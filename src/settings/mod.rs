//! Settings management for Colloquy
//!
//! A single flat record of API credentials and behavioral flags with
//! documented defaults, persisted through the local key-value store.
//! Loading merges the persisted record over the defaults; validation
//! reports every violated constraint instead of failing on the first.

use crate::api::ApiConfig;
use crate::error::{ColloquyError, Result};
use crate::storage::{
    LocalStore, CONVERSATIONS_KEY, SETTINGS_KEY, STORAGE_QUOTA_BYTES, THEME_KEY,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// The flat settings record
///
/// Grouped by concern: API, model, UI, chat, privacy, advanced. Every
/// field has a serde default so partially persisted records merge over
/// the documented defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    // API settings
    /// API credential (never exported in clear)
    #[serde(default)]
    pub api_key: String,
    /// Base endpoint for all requests
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model used for new conversations
    #[serde(default = "default_model")]
    pub default_model: String,

    // Model settings
    /// Completion token budget
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Nucleus sampling parameter
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    /// Top-k sampling parameter
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    /// Frequency penalty
    #[serde(default)]
    pub frequency_penalty: f64,
    /// Presence penalty
    #[serde(default)]
    pub presence_penalty: f64,

    // UI settings
    /// Terminal theme, `"light"` or `"dark"`
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Interface language
    #[serde(default = "default_language")]
    pub language: String,
    /// Font size label
    #[serde(default = "default_font_size")]
    pub font_size: String,
    /// Show message timestamps
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
    /// Show per-message action hints
    #[serde(default = "default_true")]
    pub show_message_actions: bool,
    /// Scroll to the newest message automatically
    #[serde(default = "default_true")]
    pub auto_scroll: bool,
    /// Compact rendering
    #[serde(default)]
    pub compact_mode: bool,

    // Chat settings
    /// Save conversations periodically
    #[serde(default = "default_true")]
    pub auto_save: bool,
    /// Maximum number of conversations to keep
    #[serde(default = "default_max_conversations")]
    pub max_conversations: u32,
    /// Maximum messages per conversation
    #[serde(default = "default_max_messages")]
    pub max_messages_per_conversation: u32,
    /// Derive conversation titles from the first user message
    #[serde(default = "default_true")]
    pub auto_title: bool,
    /// Ask before deleting conversations
    #[serde(default = "default_true")]
    pub confirm_delete: bool,

    // Privacy settings
    /// Share usage data
    #[serde(default)]
    pub share_data: bool,
    /// Enable analytics
    #[serde(default = "default_true")]
    pub analytics_enabled: bool,
    /// Enable error reporting
    #[serde(default = "default_true")]
    pub error_reporting: bool,

    // Advanced settings
    /// Verbose diagnostics
    #[serde(default)]
    pub debug_mode: bool,
    /// Log level label
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Stream assistant replies
    #[serde(default = "default_true")]
    pub stream_responses: bool,
    /// Show model thinking traces when available
    #[serde(default)]
    pub show_thinking: bool,
    /// Preferred request path: `messages`, `completions`, or `raw`
    #[serde(default = "default_transport")]
    pub transport: String,
}

fn default_base_url() -> String {
    "https://api.minimax.chat/v1".to_string()
}

fn default_model() -> String {
    crate::api::DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    crate::api::DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f64 {
    crate::api::DEFAULT_TEMPERATURE
}

fn default_top_p() -> f64 {
    1.0
}

fn default_top_k() -> u32 {
    40
}

fn default_theme() -> String {
    "light".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_font_size() -> String {
    "medium".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_conversations() -> u32 {
    100
}

fn default_max_messages() -> u32 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_transport() -> String {
    "messages".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            default_model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            theme: default_theme(),
            language: default_language(),
            font_size: default_font_size(),
            show_timestamps: true,
            show_message_actions: true,
            auto_scroll: true,
            compact_mode: false,
            auto_save: true,
            max_conversations: default_max_conversations(),
            max_messages_per_conversation: default_max_messages(),
            auto_title: true,
            confirm_delete: true,
            share_data: false,
            analytics_enabled: true,
            error_reporting: true,
            debug_mode: false,
            log_level: default_log_level(),
            stream_responses: true,
            show_thinking: false,
            transport: default_transport(),
        }
    }
}

impl Settings {
    /// Whether the API credential and endpoint are both present
    pub fn is_api_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.base_url.is_empty()
    }

    /// Service configuration derived from these settings
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            preferred: Some(self.transport.clone()),
        }
    }

    /// Validate every constraint, returning all violations
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::settings::Settings;
    ///
    /// let mut settings = Settings::default();
    /// settings.base_url = "not-a-url".to_string();
    /// settings.max_tokens = 5000;
    /// let violations = settings.validate();
    /// assert!(violations.len() >= 3); // missing key, bad URL, token range
    /// ```
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.api_key.is_empty() {
            errors.push("API key is required".to_string());
        }

        if self.base_url.is_empty() {
            errors.push("Base URL is required".to_string());
        } else if Url::parse(&self.base_url).is_err() {
            errors.push("Invalid base URL format".to_string());
        }

        if self.max_tokens < 1 || self.max_tokens > 4096 {
            errors.push("Max tokens must be between 1 and 4096".to_string());
        }
        if self.temperature < 0.0 || self.temperature > 2.0 {
            errors.push("Temperature must be between 0 and 2".to_string());
        }
        if self.top_p < 0.0 || self.top_p > 1.0 {
            errors.push("Top P must be between 0 and 1".to_string());
        }
        if self.top_k < 1 || self.top_k > 100 {
            errors.push("Top K must be between 1 and 100".to_string());
        }
        if self.max_conversations < 1 || self.max_conversations > 1000 {
            errors.push("Max conversations must be between 1 and 1000".to_string());
        }
        if self.max_messages_per_conversation < 1 || self.max_messages_per_conversation > 10000 {
            errors.push("Max messages per conversation must be between 1 and 10000".to_string());
        }

        errors
    }
}

/// Outcome of a settings import
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    /// Whether the import was applied
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
}

/// Storage usage against the fixed quota
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StorageUsage {
    /// Total bytes used across the persisted records
    pub used: usize,
    /// Fixed quota in bytes
    pub max: usize,
    /// `used` as a percentage of `max`
    pub percentage: f64,
    /// Per-record byte counts
    pub breakdown: StorageBreakdown,
}

/// Per-record byte counts
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StorageBreakdown {
    /// Settings record
    pub settings: usize,
    /// Conversations record
    pub conversations: usize,
    /// Theme record
    pub theme: usize,
}

/// The settings store
///
/// Owns the in-memory record and its persistence. Without attached
/// storage every operation works in memory only (useful in tests).
pub struct SettingsStore {
    settings: Settings,
    storage: Option<LocalStore>,
    last_error: Option<String>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore {
    /// Creates a store holding the documented defaults
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            storage: None,
            last_error: None,
        }
    }

    /// Attach the local key-value store used for persistence
    pub fn set_storage(&mut self, storage: LocalStore) {
        self.storage = Some(storage);
    }

    /// The current settings record
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The last load/import error, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replace the whole record and persist
    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.save_settings();
    }

    /// Update a single setting by key and persist
    ///
    /// Keys use the field names of [`Settings`]; values are parsed per
    /// field type.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown keys or unparseable
    /// values.
    pub fn update_setting(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api_key" => self.settings.api_key = value.to_string(),
            "base_url" => self.settings.base_url = value.to_string(),
            "default_model" => self.settings.default_model = value.to_string(),
            "max_tokens" => self.settings.max_tokens = parse_number(key, value)?,
            "temperature" => self.settings.temperature = parse_number(key, value)?,
            "top_p" => self.settings.top_p = parse_number(key, value)?,
            "top_k" => self.settings.top_k = parse_number(key, value)?,
            "frequency_penalty" => self.settings.frequency_penalty = parse_number(key, value)?,
            "presence_penalty" => self.settings.presence_penalty = parse_number(key, value)?,
            "theme" => return self.set_theme(value),
            "language" => self.settings.language = value.to_string(),
            "font_size" => self.settings.font_size = value.to_string(),
            "show_timestamps" => self.settings.show_timestamps = parse_bool(key, value)?,
            "show_message_actions" => self.settings.show_message_actions = parse_bool(key, value)?,
            "auto_scroll" => self.settings.auto_scroll = parse_bool(key, value)?,
            "compact_mode" => self.settings.compact_mode = parse_bool(key, value)?,
            "auto_save" => self.settings.auto_save = parse_bool(key, value)?,
            "max_conversations" => self.settings.max_conversations = parse_number(key, value)?,
            "max_messages_per_conversation" => {
                self.settings.max_messages_per_conversation = parse_number(key, value)?
            }
            "auto_title" => self.settings.auto_title = parse_bool(key, value)?,
            "confirm_delete" => self.settings.confirm_delete = parse_bool(key, value)?,
            "share_data" => self.settings.share_data = parse_bool(key, value)?,
            "analytics_enabled" => self.settings.analytics_enabled = parse_bool(key, value)?,
            "error_reporting" => self.settings.error_reporting = parse_bool(key, value)?,
            "debug_mode" => self.settings.debug_mode = parse_bool(key, value)?,
            "log_level" => self.settings.log_level = value.to_string(),
            "stream_responses" => self.settings.stream_responses = parse_bool(key, value)?,
            "show_thinking" => self.settings.show_thinking = parse_bool(key, value)?,
            "transport" => self.settings.transport = value.to_string(),
            other => {
                return Err(
                    ColloquyError::Config(format!("unknown setting: {}", other)).into(),
                )
            }
        }
        self.save_settings();
        Ok(())
    }

    /// Restore the documented defaults and persist
    pub fn reset_settings(&mut self) {
        self.settings = Settings::default();
        self.save_settings();
    }

    /// Load the persisted record, merged over the defaults
    ///
    /// Environment overrides (`COLLOQUY_API_KEY`, `COLLOQUY_BASE_URL`,
    /// `COLLOQUY_MODEL`) are applied last. A parse failure falls back to
    /// the defaults and records an error instead of propagating.
    pub fn load_settings(&mut self) {
        self.last_error = None;

        if let Some(storage) = &self.storage {
            match storage.get(SETTINGS_KEY) {
                Ok(Some(serialized)) => match serde_json::from_str::<Settings>(&serialized) {
                    Ok(settings) => self.settings = settings,
                    Err(error) => {
                        tracing::error!("failed to parse persisted settings: {}", error);
                        self.last_error = Some("Failed to load settings".to_string());
                        self.settings = Settings::default();
                    }
                },
                Ok(None) => {}
                Err(error) => {
                    tracing::error!("failed to read persisted settings: {}", error);
                    self.last_error = Some("Failed to load settings".to_string());
                    self.settings = Settings::default();
                }
            }

            // Theme preference lives under its own key and wins when set.
            if let Ok(Some(theme)) = storage.get(THEME_KEY) {
                if theme == "light" || theme == "dark" {
                    self.settings.theme = theme;
                }
            }
        }

        self.apply_env_vars();
    }

    fn apply_env_vars(&mut self) {
        if let Ok(api_key) = std::env::var("COLLOQUY_API_KEY") {
            self.settings.api_key = api_key;
        }
        if let Ok(base_url) = std::env::var("COLLOQUY_BASE_URL") {
            self.settings.base_url = base_url;
        }
        if let Ok(model) = std::env::var("COLLOQUY_MODEL") {
            self.settings.default_model = model;
        }
    }

    /// Persist the current record
    ///
    /// Best-effort: failures are logged, never propagated. Release
    /// builds persist the record with the API key blanked; the key then
    /// comes from the environment on the next load.
    pub fn save_settings(&self) {
        let Some(storage) = &self.storage else {
            return;
        };

        let mut safe = self.settings.clone();
        if !cfg!(debug_assertions) {
            safe.api_key.clear();
        }

        match serde_json::to_string(&safe) {
            Ok(json) => {
                if let Err(error) = storage.put(SETTINGS_KEY, &json) {
                    tracing::error!("failed to save settings: {}", error);
                }
            }
            Err(error) => tracing::error!("failed to serialize settings: {}", error),
        }
    }

    /// Set and persist the theme preference
    ///
    /// # Errors
    ///
    /// Returns a configuration error for anything other than `light` or
    /// `dark`.
    pub fn set_theme(&mut self, theme: &str) -> Result<()> {
        if theme != "light" && theme != "dark" {
            return Err(
                ColloquyError::Config(format!("unknown theme: {}", theme)).into(),
            );
        }
        self.settings.theme = theme.to_string();
        if let Some(storage) = &self.storage {
            if let Err(error) = storage.put(THEME_KEY, theme) {
                tracing::error!("failed to save theme: {}", error);
            }
        }
        self.save_settings();
        Ok(())
    }

    /// Toggle between light and dark themes
    pub fn toggle_theme(&mut self) {
        let next = if self.settings.theme == "light" {
            "dark"
        } else {
            "light"
        };
        // Both values are valid, so this cannot fail.
        let _ = self.set_theme(next);
    }

    /// Validate the current record, returning all violations
    pub fn validate_settings(&self) -> Vec<String> {
        self.settings.validate()
    }

    /// Export the record with the API key redacted
    pub fn export_settings(&self) -> Value {
        let mut settings =
            serde_json::to_value(&self.settings).unwrap_or(Value::Object(serde_json::Map::new()));
        if let Some(object) = settings.as_object_mut() {
            if object
                .get("api_key")
                .and_then(|v| v.as_str())
                .map(|s| !s.is_empty())
                .unwrap_or(false)
            {
                object.insert("api_key".to_string(), Value::String("[REDACTED]".into()));
            }
        }
        serde_json::json!({
            "version": "1.0.0",
            "exported_at": chrono::Utc::now(),
            "settings": settings,
        })
    }

    /// Merge an exported record into the current settings and persist
    ///
    /// Unknown keys are ignored; type mismatches fail the whole import.
    pub fn import_settings(&mut self, data: &Value) -> ImportReport {
        let Some(incoming) = data.get("settings").and_then(|v| v.as_object()) else {
            return ImportReport {
                success: false,
                message: "Failed to import settings: invalid settings data".to_string(),
            };
        };

        let mut merged = match serde_json::to_value(&self.settings) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        for (key, value) in incoming {
            // A redacted key in an export must not clobber the real one.
            if key == "api_key" && value.as_str() == Some("[REDACTED]") {
                continue;
            }
            merged.insert(key.clone(), value.clone());
        }

        match serde_json::from_value::<Settings>(Value::Object(merged)) {
            Ok(settings) => {
                self.settings = settings;
                self.save_settings();
                ImportReport {
                    success: true,
                    message: "Settings imported successfully".to_string(),
                }
            }
            Err(error) => ImportReport {
                success: false,
                message: format!("Failed to import settings: {}", error),
            },
        }
    }

    /// Sum the persisted record sizes against the fixed quota
    pub fn storage_usage(&self) -> StorageUsage {
        let (settings, conversations, theme) = match &self.storage {
            Some(storage) => (
                storage.len_of(SETTINGS_KEY).unwrap_or(0),
                storage.len_of(CONVERSATIONS_KEY).unwrap_or(0),
                storage.len_of(THEME_KEY).unwrap_or(0),
            ),
            None => (0, 0, 0),
        };
        let used = settings + conversations + theme;
        StorageUsage {
            used,
            max: STORAGE_QUOTA_BYTES,
            percentage: (used as f64 / STORAGE_QUOTA_BYTES as f64) * 100.0,
            breakdown: StorageBreakdown {
                settings,
                conversations,
                theme,
            },
        }
    }

    /// Erase every persisted record and reset in-memory state
    pub fn clear_all_data(&mut self) -> ImportReport {
        if let Some(storage) = &self.storage {
            if let Err(error) = storage.clear() {
                return ImportReport {
                    success: false,
                    message: format!("Failed to clear data: {}", error),
                };
            }
        }
        self.settings = Settings::default();
        ImportReport {
            success: true,
            message: "All data cleared successfully".to_string(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(ColloquyError::Config(format!(
            "setting {} expects a boolean, got: {}",
            key, other
        ))
        .into()),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        ColloquyError::Config(format!("setting {} expects a number, got: {}", key, value)).into()
    })
}

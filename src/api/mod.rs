//! Canonical API types for Colloquy
//!
//! This module defines the backend-agnostic request and response shapes
//! shared by every transport: the uniform chat request, the canonical
//! response record, token usage, finish reasons, and streaming events.
//! Whatever wire format a backend speaks, the rest of the application
//! only ever sees these types.

use serde::{Deserialize, Serialize};

pub mod service;

pub use service::{ApiConfig, ChatService, ConnectionReport};

/// Default model identifier when none is configured
pub const DEFAULT_MODEL: &str = "minimax-m2";

/// Default completion token budget
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Request timeout for non-streaming calls (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Message author role
///
/// Conversations alternate between user turns and assistant turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A message written by the user
    User,
    /// A message produced by the model
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A role/content pair as sent to the backend
///
/// This is the canonical history entry; conversation messages are
/// projected down to this shape before a request is issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Author of this turn
    pub role: Role,
    /// Text content of this turn
    pub content: String,
}

impl ApiMessage {
    /// Creates a new user turn
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::api::{ApiMessage, Role};
    ///
    /// let msg = ApiMessage::user("Hello!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Uniform request accepted by every transport
///
/// Optional sampling parameters are skipped on the wire when unset so
/// each backend only sees the fields it was given.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// Full conversation history, oldest first
    pub messages: Vec<ApiMessage>,
    /// Completion token budget
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f64,
    /// Whether to request an incremental (SSE) response
    pub stream: bool,
    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// System prompt (messages-style backends)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Nucleus sampling parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Top-k sampling parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Frequency penalty (completions-style backends)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Presence penalty (completions-style backends)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
}

impl ChatRequest {
    /// Creates a request with default generation parameters
    ///
    /// # Arguments
    ///
    /// * `model` - Model identifier
    /// * `messages` - Conversation history, oldest first
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::api::{ApiMessage, ChatRequest};
    ///
    /// let request = ChatRequest::new("minimax-m2", vec![ApiMessage::user("Hi")]);
    /// assert_eq!(request.max_tokens, 2048);
    /// assert!(!request.stream);
    /// ```
    pub fn new(model: impl Into<String>, messages: Vec<ApiMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            stream: false,
            stop: None,
            system: None,
            top_p: None,
            top_k: None,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }
}

/// Token usage reported by the backend, in canonical field names
///
/// Completions-style backends report `prompt_tokens`/`completion_tokens`;
/// messages-style backends already use these names. Both normalize here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub input_tokens: u64,
    /// Tokens produced in the completion
    pub output_tokens: u64,
}

impl Usage {
    /// Create a new usage record
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// Why the backend stopped generating
///
/// Backend-specific reason strings (`end_turn`, `max_tokens`, ...) are
/// normalized through [`FinishReason::parse`]; reasons with no canonical
/// equivalent are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of the completion (or a stop sequence was hit)
    Stop,
    /// The token budget was exhausted
    Length,
    /// The backend filtered the content
    ContentFilter,
    /// Any reason without a canonical mapping, preserved verbatim
    #[serde(untagged)]
    Other(String),
}

impl FinishReason {
    /// Normalize a backend-specific reason string
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::api::FinishReason;
    ///
    /// assert_eq!(FinishReason::parse("stop"), FinishReason::Stop);
    /// assert_eq!(FinishReason::parse("end_turn"), FinishReason::Stop);
    /// assert_eq!(FinishReason::parse("max_tokens"), FinishReason::Length);
    /// ```
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" | "end_turn" | "stop_sequence" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Length => write!(f, "length"),
            Self::ContentFilter => write!(f, "content_filter"),
            Self::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// The backend-agnostic normalized response shape
///
/// Produced per request by whichever transport answered, consumed by the
/// conversation store, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalResponse {
    /// Assistant reply text
    pub content: String,
    /// Always [`Role::Assistant`]
    pub role: Role,
    /// Model that produced the reply
    pub model: String,
    /// Token usage in canonical field names
    pub usage: Usage,
    /// Why generation stopped
    pub finish_reason: FinishReason,
}

/// One incremental unit of a streaming response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of assistant text
    Text {
        /// The text fragment
        content: String,
    },
    /// Terminal event: generation finished
    Stop {
        /// Why generation stopped
        reason: FinishReason,
    },
}

/// Model metadata returned by `GET /models`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier
    pub id: String,
    /// Object type tag (always `"model"`)
    #[serde(default = "default_model_object")]
    pub object: String,
    /// Creation timestamp (Unix seconds)
    #[serde(default)]
    pub created: Option<u64>,
    /// Owning organization
    #[serde(default)]
    pub owned_by: Option<String>,
}

fn default_model_object() -> String {
    "model".to_string()
}

/// Response envelope of `GET /models`
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    /// Listed models
    pub data: Vec<ModelInfo>,
}

/// Account metadata returned by `GET /account`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Object type tag (always `"account"`)
    #[serde(default)]
    pub object: String,
    /// Account identifier
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Contact email
    #[serde(default)]
    pub email: Option<String>,
}

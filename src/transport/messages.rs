//! Structured-messages transport
//!
//! Speaks the Anthropic-style wire format: `POST {base}/text/v1/messages`
//! with `x-api-key` authentication, a `content` block array in the
//! response, and `stop_reason`/`input_tokens`/`output_tokens` metadata.
//! This is the preferred request path.

use crate::api::{
    ApiMessage, CanonicalResponse, ChatRequest, FinishReason, Role, StreamEvent, Usage,
    REQUEST_TIMEOUT_SECS,
};
use crate::error::{ColloquyError, Result};
use crate::transport::sse::{event_stream, EventStream, SseChunk};
use crate::transport::{api_error, classify_request_error, Transport, TransportKind};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Protocol version header required by messages-style backends
const MESSAGES_API_VERSION: &str = "2023-06-01";

/// The structured-messages request path
pub struct MessagesTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Request body in messages wire format
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage],
    max_tokens: u32,
    temperature: f64,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

/// Response envelope in messages wire format
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: MessagesUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl MessagesTransport {
    /// Create a new messages transport
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/text/v1/messages", self.base_url)
    }

    fn wire_request<'a>(request: &'a ChatRequest, stream: bool) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
            stop_sequences: request.stop.as_ref(),
            system: request.system.as_deref(),
            top_p: request.top_p,
            top_k: request.top_k,
        }
    }

    async fn post(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", MESSAGES_API_VERSION)
            .json(&Self::wire_request(request, stream));
        if !stream {
            builder = builder.timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS));
        }

        let response = builder.send().await.map_err(classify_request_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body).into());
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for MessagesTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Messages
    }

    async fn send(&self, request: &ChatRequest) -> Result<CanonicalResponse> {
        let response = self.post(request, false).await?;
        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            ColloquyError::Malformed(format!("failed to parse messages response: {}", e))
        })?;

        let content = parsed
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| {
                ColloquyError::Malformed("messages response contained no content".to_string())
            })?;

        Ok(CanonicalResponse {
            content,
            role: Role::Assistant,
            model: if parsed.model.is_empty() {
                request.model.clone()
            } else {
                parsed.model
            },
            usage: Usage::new(parsed.usage.input_tokens, parsed.usage.output_tokens),
            finish_reason: parsed
                .stop_reason
                .as_deref()
                .map(FinishReason::parse)
                .unwrap_or(FinishReason::Stop),
        })
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<EventStream> {
        let response = self.post(request, true).await?;
        Ok(event_stream(response, parse_messages_chunk))
    }
}

/// Parse one messages SSE chunk into canonical events
///
/// Emits `Text` for `content_block_delta` chunks carrying `delta.text`
/// and `Stop` for `message_delta` chunks carrying `delta.stop_reason`;
/// every other chunk type is skipped.
pub(crate) fn parse_messages_chunk(data: &str) -> SseChunk {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(data) else {
        return SseChunk::Events(Vec::new());
    };

    let mut events = Vec::new();
    match value.get("type").and_then(|t| t.as_str()) {
        Some("content_block_delta") => {
            if let Some(text) = value
                .pointer("/delta/text")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
            {
                events.push(StreamEvent::Text {
                    content: text.to_string(),
                });
            }
        }
        Some("message_delta") => {
            if let Some(reason) = value.pointer("/delta/stop_reason").and_then(|v| v.as_str()) {
                events.push(StreamEvent::Stop {
                    reason: FinishReason::parse(reason),
                });
            }
        }
        _ => {}
    }
    SseChunk::Events(events)
}

//! Chat-completions transport
//!
//! Speaks the OpenAI-style wire format: `POST {base}/text/v1/chat/completions`
//! with a `choices`/`usage` response envelope. Field names are normalized
//! into the canonical shape (`prompt_tokens` becomes `usage.input_tokens`,
//! and so on).

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

/// The chat-completions request path
pub struct CompletionsTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Request body in completions wire format
#[derive(Debug, Serialize)]
struct CompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage],
    max_tokens: u32,
    temperature: f64,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f64>,
}

/// Response envelope in completions wire format
#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    choices: Vec<CompletionsChoice>,
    #[serde(default)]
    usage: CompletionsUsage,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct CompletionsChoice {
    message: CompletionsMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionsMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionsUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl CompletionsTransport {
    /// Create a new completions transport
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/text/v1/chat/completions", self.base_url)
    }

    fn wire_request<'a>(request: &'a ChatRequest, stream: bool) -> CompletionsRequest<'a> {
        CompletionsRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
            stop: request.stop.as_ref(),
            top_p: request.top_p,
            top_k: request.top_k,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
        }
    }

    async fn post(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
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
impl Transport for CompletionsTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Completions
    }

    async fn send(&self, request: &ChatRequest) -> Result<CanonicalResponse> {
        let response = self.post(request, false).await?;
        let parsed: CompletionsResponse = response.json().await.map_err(|e| {
            ColloquyError::Malformed(format!("failed to parse completions response: {}", e))
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            ColloquyError::Malformed("completions response contained no choices".to_string())
        })?;

        Ok(CanonicalResponse {
            content: choice.message.content,
            role: Role::Assistant,
            model: if parsed.model.is_empty() {
                request.model.clone()
            } else {
                parsed.model
            },
            usage: Usage::new(parsed.usage.prompt_tokens, parsed.usage.completion_tokens),
            finish_reason: choice
                .finish_reason
                .as_deref()
                .map(FinishReason::parse)
                .unwrap_or(FinishReason::Stop),
        })
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<EventStream> {
        let response = self.post(request, true).await?;
        Ok(event_stream(response, parse_completions_chunk))
    }
}

/// Parse one completions SSE chunk into canonical events
///
/// Emits `Text` for `choices[0].delta.content` and `Stop` for
/// `choices[0].finish_reason`; a single chunk may carry both. The
/// `[DONE]` sentinel terminates the stream and anything unrecognized is
/// skipped.
pub(crate) fn parse_completions_chunk(data: &str) -> SseChunk {
    if data == "[DONE]" {
        return SseChunk::Done;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(data) else {
        return SseChunk::Events(Vec::new());
    };
    let Some(choice) = value.get("choices").and_then(|c| c.get(0)) else {
        return SseChunk::Events(Vec::new());
    };

    let mut events = Vec::new();
    if let Some(content) = choice
        .pointer("/delta/content")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
    {
        events.push(StreamEvent::Text {
            content: content.to_string(),
        });
    }
    if let Some(reason) = choice.get("finish_reason").and_then(|v| v.as_str()) {
        events.push(StreamEvent::Stop {
            reason: FinishReason::parse(reason),
        });
    }
    SseChunk::Events(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_construction() {
        let transport =
            CompletionsTransport::new(Client::new(), "https://api.minimax.chat/v1", "key");
        assert_eq!(
            transport.endpoint(),
            "https://api.minimax.chat/v1/text/v1/chat/completions"
        );
    }

    #[test]
    fn test_kind() {
        let transport = CompletionsTransport::new(Client::new(), "https://example.com", "key");
        assert_eq!(transport.kind(), TransportKind::Completions);
    }

    #[test]
    fn test_wire_request_serialization() {
        let mut request = ChatRequest::new("minimax-m2", vec![ApiMessage::user("Hi")]);
        request.top_p = Some(0.9);
        let wire = CompletionsTransport::wire_request(&request, true);
        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains("\"stream\":true"));
        assert!(json.contains("\"top_p\":0.9"));
        assert!(!json.contains("frequency_penalty"));
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Hi there"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 3},
            "model": "minimax-m2"
        }"#;
        let parsed: CompletionsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Hi there");
        assert_eq!(parsed.usage.prompt_tokens, 5);
        assert_eq!(parsed.usage.completion_tokens, 3);
    }

    #[test]
    fn test_response_tolerates_missing_usage() {
        let json = r#"{"choices": [{"message": {"content": "x"}}]}"#;
        let parsed: CompletionsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.usage.prompt_tokens, 0);
        assert!(parsed.choices[0].finish_reason.is_none());
    }

    #[test]
    fn test_parse_chunk_text_delta() {
        let chunk = parse_completions_chunk(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#);
        match chunk {
            SseChunk::Events(events) => assert_eq!(
                events,
                vec![StreamEvent::Text {
                    content: "Hi".to_string()
                }]
            ),
            SseChunk::Done => panic!("unexpected Done"),
        }
    }

    #[test]
    fn test_parse_chunk_text_and_finish_in_one_chunk() {
        let chunk = parse_completions_chunk(
            r#"{"choices":[{"delta":{"content":"!"},"finish_reason":"length"}]}"#,
        );
        match chunk {
            SseChunk::Events(events) => {
                assert_eq!(events.len(), 2);
                assert_eq!(
                    events[1],
                    StreamEvent::Stop {
                        reason: FinishReason::Length
                    }
                );
            }
            SseChunk::Done => panic!("unexpected Done"),
        }
    }

    #[test]
    fn test_parse_chunk_done_sentinel() {
        assert!(matches!(parse_completions_chunk("[DONE]"), SseChunk::Done));
    }

    #[test]
    fn test_parse_chunk_empty_delta_skipped() {
        let chunk = parse_completions_chunk(r#"{"choices":[{"delta":{}}]}"#);
        match chunk {
            SseChunk::Events(events) => assert!(events.is_empty()),
            SseChunk::Done => panic!("unexpected Done"),
        }
    }
}

//! Raw HTTP transport
//!
//! The last-resort request path: a plain `POST` to
//! `{base}/text/v1/chat/completions` with a hand-built JSON body and
//! untyped response navigation. The wire shape matches the completions
//! path; the difference is that nothing here depends on typed response
//! envelopes, so this path keeps working against backends that add or
//! reshuffle fields.

use crate::api::{
    CanonicalResponse, ChatRequest, FinishReason, Role, Usage, REQUEST_TIMEOUT_SECS,
};
use crate::error::{ColloquyError, Result};
use crate::transport::completions::parse_completions_chunk;
use crate::transport::sse::{event_stream, EventStream};
use crate::transport::{api_error, classify_request_error, Transport, TransportKind};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// The raw HTTP POST request path
pub struct RawTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RawTransport {
    /// Create a new raw transport
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

    fn body(request: &ChatRequest, stream: bool) -> Value {
        let mut object = serde_json::Map::new();
        object.insert("model".to_string(), json!(request.model));
        object.insert("messages".to_string(), json!(request.messages));
        object.insert("max_tokens".to_string(), json!(request.max_tokens));
        object.insert("temperature".to_string(), json!(request.temperature));
        object.insert("stream".to_string(), json!(stream));
        if let Some(stop) = &request.stop {
            object.insert("stop".to_string(), json!(stop));
        }
        if let Some(top_p) = request.top_p {
            object.insert("top_p".to_string(), json!(top_p));
        }
        if let Some(top_k) = request.top_k {
            object.insert("top_k".to_string(), json!(top_k));
        }
        if let Some(penalty) = request.frequency_penalty {
            object.insert("frequency_penalty".to_string(), json!(penalty));
        }
        if let Some(penalty) = request.presence_penalty {
            object.insert("presence_penalty".to_string(), json!(penalty));
        }
        Value::Object(object)
    }

    async fn post(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&Self::body(request, stream));
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
impl Transport for RawTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Raw
    }

    async fn send(&self, request: &ChatRequest) -> Result<CanonicalResponse> {
        let response = self.post(request, false).await?;
        let value: Value = response.json().await.map_err(|e| {
            ColloquyError::Malformed(format!("failed to parse raw response: {}", e))
        })?;

        let content = value
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ColloquyError::Malformed(
                    "raw response is missing choices[0].message.content".to_string(),
                )
            })?
            .to_string();

        let model = value
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or(&request.model)
            .to_string();

        let usage = Usage::new(
            value
                .pointer("/usage/prompt_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            value
                .pointer("/usage/completion_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
        );

        let finish_reason = value
            .pointer("/choices/0/finish_reason")
            .and_then(|v| v.as_str())
            .map(FinishReason::parse)
            .unwrap_or(FinishReason::Stop);

        Ok(CanonicalResponse {
            content,
            role: Role::Assistant,
            model,
            usage,
            finish_reason,
        })
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<EventStream> {
        let response = self.post(request, true).await?;
        // The raw path shares the completions chunk schema.
        Ok(event_stream(response, parse_completions_chunk))
    }
}

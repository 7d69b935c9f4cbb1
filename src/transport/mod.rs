//! Transport abstraction for Colloquy
//!
//! This module defines the [`Transport`] trait implemented by the three
//! request paths (structured messages, chat completions, raw HTTP POST),
//! the factory that selects one at configuration time, and the shared
//! error classification applied at the service boundary.

use crate::api::{CanonicalResponse, ChatRequest};
use crate::error::{ColloquyError, Result};

use async_trait::async_trait;
use reqwest::StatusCode;

pub mod completions;
pub mod messages;
pub mod raw;
pub mod sse;

pub use completions::CompletionsTransport;
pub use messages::MessagesTransport;
pub use raw::RawTransport;
pub use sse::EventStream;

/// The closed set of request paths
///
/// Selection happens once, when the service is configured; it is never
/// re-evaluated per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Structured-messages path (Anthropic-style wire shape)
    #[default]
    Messages,
    /// Chat-completions path (OpenAI-style wire shape)
    Completions,
    /// Raw HTTP POST path
    Raw,
}

impl TransportKind {
    /// Parse a transport kind from a string
    ///
    /// Unknown values fall back to the default preference order, i.e.
    /// the messages path.
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::transport::TransportKind;
    ///
    /// assert_eq!(TransportKind::parse_str("completions"), TransportKind::Completions);
    /// assert_eq!(TransportKind::parse_str("unknown"), TransportKind::Messages);
    /// ```
    pub fn parse_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "completions" => Self::Completions,
            "raw" | "http" => Self::Raw,
            _ => Self::Messages,
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Messages => write!(f, "messages"),
            Self::Completions => write!(f, "completions"),
            Self::Raw => write!(f, "raw"),
        }
    }
}

/// A single request path to the backend
///
/// All implementations accept the uniform [`ChatRequest`] and return the
/// canonical response shape, whatever their wire format. If a transport
/// fails, the error propagates; there is no silent fallback to another
/// path.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Which path this transport implements
    fn kind(&self) -> TransportKind;

    /// Issue a non-streaming request and normalize the response
    ///
    /// # Errors
    ///
    /// Returns a configuration, request, network, or malformed-data error
    /// per the client's error taxonomy.
    async fn send(&self, request: &ChatRequest) -> Result<CanonicalResponse>;

    /// Issue a streaming request and adapt the SSE body
    ///
    /// The returned stream is lazy, finite (it terminates on a stop
    /// event), and single-pass; dropping it releases the connection.
    async fn open_stream(&self, request: &ChatRequest) -> Result<EventStream>;
}

/// Create a transport instance for the selected path
///
/// # Arguments
///
/// * `kind` - Which request path to use
/// * `client` - Shared HTTP client
/// * `base_url` - API base endpoint (validated by the service)
/// * `api_key` - Bearer credential
///
/// # Examples
///
/// ```
/// use colloquy::transport::{create_transport, TransportKind};
///
/// let client = reqwest::Client::new();
/// let transport = create_transport(
///     TransportKind::Completions,
///     client,
///     "https://api.minimax.chat/v1",
///     "sk-test",
/// );
/// assert_eq!(transport.kind(), TransportKind::Completions);
/// ```
pub fn create_transport(
    kind: TransportKind,
    client: reqwest::Client,
    base_url: &str,
    api_key: &str,
) -> Box<dyn Transport> {
    match kind {
        TransportKind::Messages => Box::new(MessagesTransport::new(client, base_url, api_key)),
        TransportKind::Completions => {
            Box::new(CompletionsTransport::new(client, base_url, api_key))
        }
        TransportKind::Raw => Box::new(RawTransport::new(client, base_url, api_key)),
    }
}

/// Map a well-known HTTP status to its fixed human-readable message
///
/// Unknown statuses return `None`; callers fall back to the backend's
/// raw message.
pub(crate) fn status_message(status: u16) -> Option<&'static str> {
    match status {
        400 => Some("Bad Request - Check your request parameters"),
        401 => Some("Unauthorized - Invalid API key"),
        403 => Some("Forbidden - Access denied"),
        404 => Some("Not Found - Resource not found"),
        429 => Some("Too Many Requests - Rate limit exceeded"),
        500 => Some("Internal Server Error - Please try again later"),
        502 => Some("Bad Gateway - Service temporarily unavailable"),
        503 => Some("Service Unavailable - Please try again later"),
        _ => None,
    }
}

/// Build a request-level error from a non-success response
///
/// Extracts the backend's own message from the body when present
/// (`message`, `error`, or `error.message`), then substitutes the fixed
/// human-readable message for well-known statuses.
pub(crate) fn api_error(status: StatusCode, body: &str) -> ColloquyError {
    let backend_message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(|m| m.as_str())
                .map(String::from)
                .or_else(|| {
                    value
                        .get("error")
                        .and_then(|e| e.as_str())
                        .map(String::from)
                })
                .or_else(|| {
                    value
                        .pointer("/error/message")
                        .and_then(|m| m.as_str())
                        .map(String::from)
                })
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "API Error".to_string()
            } else {
                body.trim().to_string()
            }
        });

    let message = status_message(status.as_u16())
        .map(String::from)
        .unwrap_or(backend_message);

    ColloquyError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Classify a reqwest failure where no response was received
///
/// Timeouts, connect failures, and other transport-level errors map to
/// the network variant; anything carrying a status has already been
/// handled by [`api_error`].
pub(crate) fn classify_request_error(error: reqwest::Error) -> ColloquyError {
    if error.status().is_none() {
        tracing::debug!("request failed without a response: {}", error);
        ColloquyError::Network("no response received - please check your connection".to_string())
    } else {
        ColloquyError::Http(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_parse() {
        assert_eq!(TransportKind::parse_str("messages"), TransportKind::Messages);
        assert_eq!(
            TransportKind::parse_str("COMPLETIONS"),
            TransportKind::Completions
        );
        assert_eq!(TransportKind::parse_str("raw"), TransportKind::Raw);
        assert_eq!(TransportKind::parse_str("http"), TransportKind::Raw);
    }

    #[test]
    fn test_transport_kind_parse_unknown_falls_back() {
        assert_eq!(TransportKind::parse_str("grpc"), TransportKind::Messages);
        assert_eq!(TransportKind::parse_str(""), TransportKind::Messages);
    }

    #[test]
    fn test_transport_kind_display() {
        assert_eq!(TransportKind::Messages.to_string(), "messages");
        assert_eq!(TransportKind::Completions.to_string(), "completions");
        assert_eq!(TransportKind::Raw.to_string(), "raw");
    }

    #[test]
    fn test_create_transport_each_kind() {
        let client = reqwest::Client::new();
        for kind in [
            TransportKind::Messages,
            TransportKind::Completions,
            TransportKind::Raw,
        ] {
            let transport = create_transport(kind, client.clone(), "https://example.com", "key");
            assert_eq!(transport.kind(), kind);
        }
    }

    #[test]
    fn test_status_message_known_codes() {
        assert_eq!(
            status_message(401),
            Some("Unauthorized - Invalid API key")
        );
        assert_eq!(
            status_message(429),
            Some("Too Many Requests - Rate limit exceeded")
        );
        assert_eq!(
            status_message(503),
            Some("Service Unavailable - Please try again later")
        );
    }

    #[test]
    fn test_status_message_unknown_code() {
        assert_eq!(status_message(418), None);
    }

    #[test]
    fn test_api_error_maps_known_status() {
        let error = api_error(StatusCode::UNAUTHORIZED, r#"{"message":"bad key"}"#);
        match error {
            ColloquyError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Unauthorized - Invalid API key");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_api_error_unknown_status_uses_backend_message() {
        let error = api_error(
            StatusCode::IM_A_TEAPOT,
            r#"{"message":"short and stout"}"#,
        );
        match error {
            ColloquyError::Api { status, message } => {
                assert_eq!(status, 418);
                assert_eq!(message, "short and stout");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_api_error_nested_error_message() {
        let error = api_error(
            StatusCode::IM_A_TEAPOT,
            r#"{"error":{"message":"nested"}}"#,
        );
        match error {
            ColloquyError::Api { message, .. } => assert_eq!(message, "nested"),
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_api_error_empty_body_falls_back() {
        let error = api_error(StatusCode::IM_A_TEAPOT, "");
        match error {
            ColloquyError::Api { message, .. } => assert_eq!(message, "API Error"),
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_api_error_plain_text_body() {
        let error = api_error(StatusCode::IM_A_TEAPOT, "upstream exploded");
        match error {
            ColloquyError::Api { message, .. } => assert_eq!(message, "upstream exploded"),
            other => panic!("expected Api error, got {:?}", other),
        }
    }
}

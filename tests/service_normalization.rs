//! Integration tests for the response-normalization service
//!
//! Exercises all three request paths against a mock backend and checks
//! that every path produces the same canonical response shape, that
//! request errors map to the documented human-readable messages, and
//! that streaming bodies adapt into canonical events.

use futures::StreamExt;
use serde_json::json;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use colloquy::api::{ApiConfig, ApiMessage, ChatRequest, ChatService, FinishReason, Role};
use colloquy::StreamEvent;

fn config_for(server: &MockServer, preferred: &str) -> ApiConfig {
    ApiConfig {
        api_key: "sk-test".to_string(),
        base_url: server.uri(),
        preferred: Some(preferred.to_string()),
    }
}

fn hello_request() -> ChatRequest {
    ChatRequest::new("minimax-m2", vec![ApiMessage::user("Hello")])
}

#[tokio::test]
async fn test_completions_path_normalizes_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/text/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Hi there"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 3},
            "model": "minimax-m2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = ChatService::new(config_for(&server, "completions")).unwrap();
    let response = service.send(&hello_request()).await.unwrap();

    assert_eq!(response.content, "Hi there");
    assert_eq!(response.role, Role::Assistant);
    assert_eq!(response.model, "minimax-m2");
    assert_eq!(response.usage.input_tokens, 5);
    assert_eq!(response.usage.output_tokens, 3);
    assert_eq!(response.finish_reason, FinishReason::Stop);
}

#[tokio::test]
async fn test_messages_path_normalizes_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/text/v1/messages"))
        .and(header("x-api-key", "sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "Hi there"}],
            "model": "minimax-m2",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 5, "output_tokens": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = ChatService::new(config_for(&server, "messages")).unwrap();
    let response = service.send(&hello_request()).await.unwrap();

    assert_eq!(response.content, "Hi there");
    assert_eq!(response.usage.input_tokens, 5);
    assert_eq!(response.usage.output_tokens, 3);
    // Backend-specific stop reasons normalize.
    assert_eq!(response.finish_reason, FinishReason::Stop);
}

#[tokio::test]
async fn test_raw_path_normalizes_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/text/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "raw reply"}, "finish_reason": "length"}],
            "usage": {"prompt_tokens": 7, "completion_tokens": 11},
            "model": "minimax-m2-stable"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = ChatService::new(config_for(&server, "raw")).unwrap();
    let response = service.send(&hello_request()).await.unwrap();

    assert_eq!(response.content, "raw reply");
    assert_eq!(response.model, "minimax-m2-stable");
    assert_eq!(response.usage.input_tokens, 7);
    assert_eq!(response.usage.output_tokens, 11);
    assert_eq!(response.finish_reason, FinishReason::Length);
}

#[tokio::test]
async fn test_401_maps_to_invalid_api_key_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/text/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "key not recognized"})),
        )
        .mount(&server)
        .await;

    let service = ChatService::new(config_for(&server, "completions")).unwrap();
    let error = service.send(&hello_request()).await.unwrap_err();
    assert_eq!(error.to_string(), "Unauthorized - Invalid API key");
}

#[tokio::test]
async fn test_429_maps_to_rate_limit_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/text/v1/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let service = ChatService::new(config_for(&server, "messages")).unwrap();
    let error = service.send(&hello_request()).await.unwrap_err();
    assert_eq!(error.to_string(), "Too Many Requests - Rate limit exceeded");
}

#[tokio::test]
async fn test_unknown_status_falls_back_to_backend_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/text/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"error": {"message": "odd input"}})),
        )
        .mount(&server)
        .await;

    let service = ChatService::new(config_for(&server, "completions")).unwrap();
    let error = service.send(&hello_request()).await.unwrap_err();
    assert_eq!(error.to_string(), "odd input");
}

#[tokio::test]
async fn test_unreachable_endpoint_maps_to_network_error() {
    // Nothing listens on this port.
    let service = ChatService::new(ApiConfig {
        api_key: "sk-test".to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
        preferred: Some("completions".to_string()),
    })
    .unwrap();

    let error = service.send(&hello_request()).await.unwrap_err();
    assert!(error.to_string().starts_with("Network error:"));
}

#[tokio::test]
async fn test_streaming_completions_adapts_to_canonical_events() {
    let server = MockServer::start().await;

    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"there\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/text/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.as_bytes(), "text/event-stream"))
        .mount(&server)
        .await;

    let service = ChatService::new(config_for(&server, "completions")).unwrap();
    let mut stream = service.send_stream(&hello_request()).await.unwrap();

    let mut text = String::new();
    let mut stop_reason = None;
    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::Text { content } => text.push_str(&content),
            StreamEvent::Stop { reason } => stop_reason = Some(reason),
        }
    }
    assert_eq!(text, "Hi there");
    assert_eq!(stop_reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn test_streaming_messages_adapts_to_canonical_events() {
    let server = MockServer::start().await;

    let body = concat!(
        "data: {\"type\":\"message_start\",\"message\":{}}\n\n",
        "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"str\"}}\n\n",
        "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"eamed\"}}\n\n",
        "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"max_tokens\"}}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/text/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.as_bytes(), "text/event-stream"))
        .mount(&server)
        .await;

    let service = ChatService::new(config_for(&server, "messages")).unwrap();
    let mut stream = service.send_stream(&hello_request()).await.unwrap();

    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            StreamEvent::Text {
                content: "str".to_string()
            },
            StreamEvent::Text {
                content: "eamed".to_string()
            },
            StreamEvent::Stop {
                reason: FinishReason::Length
            },
        ]
    );
}

#[tokio::test]
async fn test_send_collected_accumulates_fragments() {
    let server = MockServer::start().await;

    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"ab\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"cd\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/text/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.as_bytes(), "text/event-stream"))
        .mount(&server)
        .await;

    let service = ChatService::new(config_for(&server, "completions")).unwrap();
    let mut seen = Vec::new();
    let response = service
        .send_collected(&hello_request(), |fragment| seen.push(fragment.to_string()))
        .await
        .unwrap();

    assert_eq!(seen, vec!["ab".to_string(), "cd".to_string()]);
    assert_eq!(response.content, "abcd");
    assert_eq!(response.finish_reason, FinishReason::Stop);
}

#[tokio::test]
async fn test_list_models_parses_endpoint_data() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/text/v1/models"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "minimax-m2", "object": "model", "owned_by": "minimax"},
                {"id": "minimax-m2-stable", "object": "model", "owned_by": "minimax"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = ChatService::new(config_for(&server, "completions")).unwrap();
    let models = service.list_models().await;
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].id, "minimax-m2");
}

#[tokio::test]
async fn test_list_models_falls_back_to_catalog_on_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/text/v1/models"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let service = ChatService::new(config_for(&server, "completions")).unwrap();
    let models = service.list_models().await;
    assert_eq!(models.len(), 2);
    assert!(models.iter().any(|m| m.id == "minimax-m2"));
    assert!(models.iter().any(|m| m.id == "minimax-m2-stable"));
}

#[tokio::test]
async fn test_get_account_parses_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/text/v1/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "account",
            "id": "account_123",
            "name": "MiniMax User",
            "email": "user@example.com"
        })))
        .mount(&server)
        .await;

    let service = ChatService::new(config_for(&server, "completions")).unwrap();
    let account = service.get_account().await.unwrap();
    assert_eq!(account.id, "account_123");
    assert_eq!(account.name.as_deref(), Some("MiniMax User"));
}

#[tokio::test]
async fn test_test_connection_success_and_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/text/v1/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "acct"})))
        .mount(&server)
        .await;

    let report = ChatService::test_connection(config_for(&server, "completions")).await;
    assert!(report.success);
    assert_eq!(report.message, "Connection successful");

    let report = ChatService::test_connection(ApiConfig {
        api_key: "sk-test".to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
        preferred: None,
    })
    .await;
    assert!(!report.success);
}

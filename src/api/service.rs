//! Chat service: the response-normalization boundary
//!
//! The service owns the HTTP client and the transport selected at
//! configuration time, and exposes the uniform request surface the rest
//! of the application uses: non-streaming sends, streaming sends, model
//! listing, account lookup, and connection testing. Whichever transport
//! answers, callers only ever see the canonical response shape.

use crate::api::{
    AccountInfo, CanonicalResponse, ChatRequest, ModelInfo, ModelsResponse, StreamEvent,
    REQUEST_TIMEOUT_SECS,
};
use crate::error::{ColloquyError, Result};
use crate::transport::{
    api_error, classify_request_error, create_transport, EventStream, Transport, TransportKind,
};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Service configuration
///
/// Carries the credential, the base endpoint, and the transport
/// preference. The preference is honored once, at construction; the
/// service never re-evaluates it per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API credential, sent as a bearer token (or `x-api-key` on the
    /// messages path)
    pub api_key: String,
    /// Base endpoint, e.g. `https://api.minimax.chat/v1`
    pub base_url: String,
    /// Preferred request path; `None` uses the default preference order
    #[serde(default)]
    pub preferred: Option<String>,
}

/// Outcome of a connection test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionReport {
    /// Whether the endpoint answered the account lookup
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
}

/// The response-normalization service
///
/// Construction fails fast on a missing credential or an unparseable
/// base endpoint. After that, the selected transport is fixed for the
/// lifetime of the service.
pub struct ChatService {
    client: reqwest::Client,
    config: ApiConfig,
    transport: Box<dyn Transport>,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("transport", &self.transport.kind())
            .finish()
    }
}

impl ChatService {
    /// Create a service from the given configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the API key is empty or the base
    /// URL does not parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::api::{ApiConfig, ChatService};
    ///
    /// let service = ChatService::new(ApiConfig {
    ///     api_key: "sk-test".to_string(),
    ///     base_url: "https://api.minimax.chat/v1".to_string(),
    ///     preferred: None,
    /// });
    /// assert!(service.is_ok());
    ///
    /// let service = ChatService::new(ApiConfig {
    ///     api_key: String::new(),
    ///     base_url: "https://api.minimax.chat/v1".to_string(),
    ///     preferred: None,
    /// });
    /// assert!(service.is_err());
    /// ```
    pub fn new(config: ApiConfig) -> Result<Self> {
        if config.api_key.is_empty() || config.base_url.is_empty() {
            return Err(
                ColloquyError::Config("API key and base URL are required".to_string()).into(),
            );
        }
        if Url::parse(&config.base_url).is_err() {
            return Err(ColloquyError::Config(format!(
                "base URL is not a valid URL: {}",
                config.base_url
            ))
            .into());
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("colloquy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ColloquyError::Config(format!("failed to create HTTP client: {}", e))
            })?;

        let kind = config
            .preferred
            .as_deref()
            .map(TransportKind::parse_str)
            .unwrap_or_default();
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let transport = create_transport(kind, client.clone(), &base_url, &config.api_key);

        tracing::info!("Initialized chat service: transport={}, base={}", kind, base_url);

        Ok(Self {
            client,
            config: ApiConfig {
                base_url,
                ..config
            },
            transport,
        })
    }

    /// Which request path this service resolved to
    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// The configured base endpoint
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Issue a non-streaming request and return the canonical response
    ///
    /// # Errors
    ///
    /// Propagates the transport's error unchanged; there is no fallback
    /// to another request path.
    pub async fn send(&self, request: &ChatRequest) -> Result<CanonicalResponse> {
        let mut request = request.clone();
        request.stream = false;
        self.transport.send(&request).await
    }

    /// Issue a streaming request and return the canonical event stream
    pub async fn send_stream(&self, request: &ChatRequest) -> Result<EventStream> {
        let mut request = request.clone();
        request.stream = true;
        self.transport.open_stream(&request).await
    }

    /// Issue a streaming request and collect it into a canonical response
    ///
    /// Convenience for callers that want incremental delivery through
    /// `on_text` but a normal response value at the end.
    pub async fn send_collected<F>(
        &self,
        request: &ChatRequest,
        mut on_text: F,
    ) -> Result<CanonicalResponse>
    where
        F: FnMut(&str),
    {
        let mut stream = self.send_stream(request).await?;
        let mut content = String::new();
        let mut finish_reason = crate::api::FinishReason::Stop;
        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Text { content: fragment } => {
                    on_text(&fragment);
                    content.push_str(&fragment);
                }
                StreamEvent::Stop { reason } => {
                    finish_reason = reason;
                }
            }
        }
        Ok(CanonicalResponse {
            content,
            role: crate::api::Role::Assistant,
            model: request.model.clone(),
            usage: crate::api::Usage::default(),
            finish_reason,
        })
    }

    /// List available models
    ///
    /// Queries `GET {base}/text/v1/models`; when the endpoint is
    /// unreachable or answers with an error, falls back to the built-in
    /// catalog so the client stays usable offline.
    pub async fn list_models(&self) -> Vec<ModelInfo> {
        match self.fetch_models().await {
            Ok(models) => models,
            Err(error) => {
                tracing::warn!("model listing failed, using built-in catalog: {}", error);
                fallback_models()
            }
        }
    }

    async fn fetch_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/text/v1/models", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body).into());
        }

        let parsed: ModelsResponse = response.json().await.map_err(|e| {
            ColloquyError::Malformed(format!("failed to parse models response: {}", e))
        })?;
        Ok(parsed.data)
    }

    /// Fetch account information
    ///
    /// # Errors
    ///
    /// Propagates request and parse failures; unlike model listing there
    /// is no offline fallback.
    pub async fn get_account(&self) -> Result<AccountInfo> {
        let url = format!("{}/text/v1/account", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body).into());
        }

        response.json().await.map_err(|e| {
            ColloquyError::Malformed(format!("failed to parse account response: {}", e)).into()
        })
    }

    /// Probe a candidate configuration without touching existing state
    ///
    /// Builds a throwaway service from `config` and performs an account
    /// lookup. Configuration errors and request failures both surface as
    /// an unsuccessful report rather than an `Err`.
    pub async fn test_connection(config: ApiConfig) -> ConnectionReport {
        let service = match Self::new(config) {
            Ok(service) => service,
            Err(error) => {
                return ConnectionReport {
                    success: false,
                    message: error.to_string(),
                }
            }
        };
        match service.get_account().await {
            Ok(_) => ConnectionReport {
                success: true,
                message: "Connection successful".to_string(),
            },
            Err(error) => ConnectionReport {
                success: false,
                message: error.to_string(),
            },
        }
    }
}

/// Built-in model catalog used when the endpoint cannot be queried
fn fallback_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo {
            id: "minimax-m2".to_string(),
            object: "model".to_string(),
            created: Some(1_642_018_789),
            owned_by: Some("minimax".to_string()),
        },
        ModelInfo {
            id: "minimax-m2-stable".to_string(),
            object: "model".to_string(),
            created: Some(1_642_018_789),
            owned_by: Some("minimax".to_string()),
        },
    ]
}

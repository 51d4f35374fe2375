//! HTTP client for the messages API.
//!
//! Thin, resilient transport: connection-pooled reqwest client, request
//! timeout, and exponential-backoff retry for transient failures. Implements
//! the `CompletionClient` port so the agent loop never sees HTTP details.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;

use super::error::ApiError;
use super::types::{
    to_domain_content, to_stop_reason, to_wire_messages, WireRequest, WireResponse, WireTool,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{CompletionClient, CompletionRequest, ModelTurn};

/// Configuration for the messages-API client.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL of the API endpoint.
    pub base_url: String,

    /// Model identifier requested for every completion.
    pub model: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum retry attempts for transient failures.
    pub max_retries: u32,

    /// Initial retry backoff in milliseconds.
    pub initial_backoff_ms: u64,

    /// Backoff ceiling in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            timeout_secs: 120,
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 8000,
        }
    }
}

/// Retry policy with exponential backoff, doubling per attempt up to the
/// configured ceiling.
#[derive(Debug, Clone)]
struct RetryPolicy {
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let ms = self
            .initial_backoff_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// Messages-API client implementing the `CompletionClient` port.
pub struct AnthropicClient {
    http: ReqwestClient,
    config: CompletionConfig,
    retry: RetryPolicy,
}

impl AnthropicClient {
    pub fn new(config: CompletionConfig) -> DomainResult<Self> {
        if config.api_key.is_empty() {
            return Err(DomainError::Configuration(
                "completion API key is empty; set ANTHROPIC_API_KEY".to_string(),
            ));
        }

        let http = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| DomainError::Configuration(format!("failed to build HTTP client: {e}")))?;

        let retry = RetryPolicy {
            max_retries: config.max_retries,
            initial_backoff_ms: config.initial_backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
        };

        Ok(Self {
            http,
            config,
            retry,
        })
    }

    async fn send_once(&self, request: &WireRequest) -> Result<WireResponse, ApiError> {
        let response = self
            .http
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ApiError::from_status(status, body));
        }

        Ok(response.json().await?)
    }

    async fn send_with_retry(&self, request: &WireRequest) -> Result<WireResponse, ApiError> {
        let mut attempt = 0;
        loop {
            match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempt < self.retry.max_retries => {
                    let backoff = self.retry.backoff(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "transient completion error, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> DomainResult<ModelTurn> {
        let (hoisted_system, messages) = to_wire_messages(&request.messages);

        // Explicit system prompt first, then any system directives appended
        // to the conversation during the session.
        let system = match (request.system, hoisted_system) {
            (Some(a), Some(b)) => Some(format!("{a}\n\n{b}")),
            (a, b) => a.or(b),
        };

        let tools: Vec<WireTool> = request
            .tools
            .iter()
            .map(|descriptor| WireTool {
                name: descriptor.name.clone(),
                description: descriptor.description.clone(),
                input_schema: descriptor.input_schema(),
            })
            .collect();

        let wire_request = WireRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            system,
            temperature: request.temperature,
            tools: if tools.is_empty() { None } else { Some(tools) },
        };

        let response = self
            .send_with_retry(&wire_request)
            .await
            .map_err(|e| DomainError::Completion(e.to_string()))?;

        tracing::debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = response.stop_reason.as_deref().unwrap_or("unknown"),
            "completion turn received"
        );

        Ok(ModelTurn {
            content: to_domain_content(&response.content),
            stop_reason: to_stop_reason(response.stop_reason.as_deref()),
        })
    }
}

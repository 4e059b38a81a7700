//! LLM Backend implementations
//!
//! The chat-completions client speaks the OpenAI-compatible wire format used by
//! Together AI, vLLM and most hosted inference providers.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use lead_agent_config::LlmSettings;

use crate::prompt::Message;
use crate::LlmError;

/// Per-call generation options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: usize,
    pub temperature: f32,
    /// Bound on a single HTTP attempt
    pub timeout: Duration,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.7,
            timeout: Duration::from_secs(20),
        }
    }
}

/// LLM generation result
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Generated text, trimmed
    pub text: String,
    /// Completion tokens reported by the provider
    pub tokens: usize,
    /// Total time including retries (ms)
    pub total_time_ms: u64,
    pub finish_reason: FinishReason,
}

/// Finish reason
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
}

/// LLM Backend trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a single non-streaming completion
    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<GenerationResult, LlmError>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Configuration for the chat-completions backend
#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    /// API base, e.g. `https://api.together.xyz/v1`
    pub endpoint: String,
    pub model: String,
    /// Bearer token; `None` fails every call before any I/O
    pub api_key: Option<String>,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self::from_settings(&LlmSettings::default(), None)
    }
}

impl ChatCompletionsConfig {
    /// Build from settings with an already-resolved key
    pub fn from_settings(settings: &LlmSettings, api_key: Option<String>) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key,
            max_retries: settings.max_retries,
            initial_backoff: settings.initial_backoff(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// OpenAI-compatible chat-completions backend
pub struct ChatCompletionsBackend {
    config: ChatCompletionsConfig,
    client: Client,
}

impl ChatCompletionsBackend {
    pub fn new(config: ChatCompletionsConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Get the full API URL for chat completions
    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    /// Execute a single request (used by retry logic)
    async fn execute_request(
        &self,
        api_key: &str,
        request: &ChatRequest<'_>,
        timeout: Duration,
    ) -> Result<ChatResponse, LlmError> {
        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await.unwrap_or_default();
            // 5xx errors are retryable, 4xx are not
            if status.is_server_error() {
                return Err(LlmError::Network(format!("Server error {}: {}", status, error)));
            }
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error)));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LlmBackend for ChatCompletionsBackend {
    /// Generate a response with retry logic for transient failures
    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<GenerationResult, LlmError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            LlmError::Configuration("No API key configured for completion service".to_string())
        })?;

        let start = Instant::now();
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stream: false,
        };

        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    "LLM request failed, retrying in {:?} (attempt {}/{})",
                    backoff,
                    attempt,
                    self.config.max_retries
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(api_key, &request, options.timeout).await {
                Ok(response) => {
                    let choice = response.choices.into_iter().next().ok_or_else(|| {
                        LlmError::InvalidResponse("No choices in response".to_string())
                    })?;

                    let text = choice.message.content.unwrap_or_default().trim().to_string();
                    if text.is_empty() {
                        return Err(LlmError::InvalidResponse("Empty completion".to_string()));
                    }

                    return Ok(GenerationResult {
                        text,
                        tokens: response.usage.map(|u| u.completion_tokens).unwrap_or(0),
                        total_time_ms: start.elapsed().as_millis() as u64,
                        finish_reason: match choice.finish_reason.as_deref() {
                            Some("length") => FinishReason::Length,
                            _ => FinishReason::Stop,
                        },
                    });
                }
                Err(e) if e.is_retryable() => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Chat-completions wire types
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ChatCompletionsConfig::default();
        assert_eq!(config.endpoint, "https://api.together.xyz/v1");
        assert_eq!(config.model, "meta-llama/Llama-3.2-11B-Vision-Instruct-Turbo");
        assert!(config.api_key.is_none());
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn test_chat_url() {
        let mut config = ChatCompletionsConfig::default();
        config.endpoint = "http://localhost:8000/v1/".to_string();
        let backend = ChatCompletionsBackend::new(config).unwrap();
        assert_eq!(backend.chat_url(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![Message::system("be brief"), Message::user("hi")];
        let request = ChatRequest {
            model: "m",
            messages: &messages,
            max_tokens: 300,
            temperature: 0.7,
            stream: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["max_tokens"], 300);
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[test]
    fn test_response_without_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant"},"finish_reason":"stop"}]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(response.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_io() {
        let mut config = ChatCompletionsConfig::default();
        // unroutable; would hang if a request were attempted
        config.endpoint = "http://10.255.255.1:9".to_string();
        let backend = ChatCompletionsBackend::new(config).unwrap();
        assert!(!backend.has_api_key());

        let result = backend
            .generate(&[Message::user("hi")], &GenerationOptions::default())
            .await;
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }
}

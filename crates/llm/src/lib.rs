//! Remote completion service integration
//!
//! Features:
//! - `LlmBackend` trait so the engine can run against any chat model
//! - OpenAI-compatible chat-completions client (Together AI by default)
//! - Retry with exponential backoff for transient failures
//! - Prompt assembly from a session transcript

pub mod backend;
pub mod factory;
pub mod prompt;

pub use backend::{
    ChatCompletionsBackend, ChatCompletionsConfig, FinishReason, GenerationOptions,
    GenerationResult, LlmBackend,
};
pub use factory::create_backend;
pub use prompt::{Message, PromptBuilder, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Non-success status that is not worth retrying (4xx)
    #[error("API error: {0}")]
    Api(String),

    /// Connection failure or 5xx
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    /// Missing credential or bad client setup; no request was sent
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Network errors and timeouts are retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::Timeout)
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Api(_) => "api",
            LlmError::Network(_) => "network",
            LlmError::InvalidResponse(_) => "invalid_response",
            LlmError::Timeout => "timeout",
            LlmError::Configuration(_) => "configuration",
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

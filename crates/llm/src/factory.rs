//! Backend construction from settings

use std::sync::Arc;

use lead_agent_config::LlmSettings;

use crate::backend::{ChatCompletionsBackend, ChatCompletionsConfig, LlmBackend};
use crate::LlmError;

/// Build the completion backend, reading the API key from the environment
///
/// A missing key is not an error here. The backend is still built and every
/// call fails fast with `LlmError::Configuration`, so sessions run on local
/// analysis and canned replies.
pub fn create_backend(settings: &LlmSettings) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let api_key = settings.api_key();
    if api_key.is_none() {
        tracing::warn!(
            env = %settings.api_key_env,
            "Completion service API key not set, replies will use canned fallbacks"
        );
    }

    let config = ChatCompletionsConfig::from_settings(settings, api_key);
    let backend = ChatCompletionsBackend::new(config)?;

    tracing::info!(
        endpoint = %settings.endpoint,
        model = %settings.model,
        "Created completion backend"
    );

    Ok(Arc::new(backend))
}

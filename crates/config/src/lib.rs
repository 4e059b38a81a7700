//! Configuration management for the lead agent
//!
//! Supports loading configuration from:
//! - TOML/YAML files under `config/` (`default`, then the environment name)
//! - Environment variables (`LEAD_AGENT__` prefix, `__` separator)
//! - An optional prompts YAML file
//!
//! The completion-service API key is never stored in settings. Only the name
//! of the environment variable is configured, and the key is read when the
//! backend is built.

pub mod constants;
pub mod prompts;
pub mod settings;

pub use prompts::PromptsConfig;
pub use settings::{
    load_settings, load_settings_from, AnalysisStrategy, CaptureConfig, EngineConfig,
    EngineMode, LlmSettings, ObservabilityConfig, RuntimeEnvironment, ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::{analysis, endpoints, generation, timeouts};
use crate::{ConfigError, PromptsConfig};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    /// Remote completion service
    #[serde(default)]
    pub llm: LlmSettings,

    /// Conversation engine behaviour
    #[serde(default)]
    pub engine: EngineConfig,

    /// Lead capture persistence
    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub prompts: PromptsConfig,

    /// Optional YAML file overriding `prompts`
    #[serde(default)]
    pub prompts_path: Option<String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_llm()?;
        self.validate_engine()?;
        self.validate_server()?;
        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;

        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            });
        }

        if llm.timeout_ms == 0 || llm.mobile_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.timeout_ms".to_string(),
                message: "Timeouts must be greater than zero".to_string(),
            });
        }

        if llm.mobile_timeout_ms > llm.timeout_ms {
            return Err(ConfigError::InvalidValue {
                field: "llm.mobile_timeout_ms".to_string(),
                message: format!(
                    "Mobile timeout ({}ms) must not exceed desktop timeout ({}ms)",
                    llm.mobile_timeout_ms, llm.timeout_ms
                ),
            });
        }

        if llm.max_tokens == 0 || llm.mobile_max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.max_tokens".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if !llm.endpoint.starts_with("http://") && !llm.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "llm.endpoint".to_string(),
                message: format!("Not an http(s) URL: {}", llm.endpoint),
            });
        }

        if self.environment.is_production() && llm.endpoint.starts_with("http://") {
            tracing::warn!(endpoint = %llm.endpoint, "Plain-HTTP LLM endpoint in production");
        }

        Ok(())
    }

    fn validate_engine(&self) -> Result<(), ConfigError> {
        if self.engine.max_analysis_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.max_analysis_chars".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.engine.analysis_temperature) {
            return Err(ConfigError::InvalidValue {
                field: "engine.analysis_temperature".to_string(),
                message: format!(
                    "Must be between 0.0 and 2.0, got {}",
                    self.engine.analysis_temperature
                ),
            });
        }

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_sessions".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.server.session_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.session_timeout_secs".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.environment.is_strict() && !self.server.cors_enabled {
            return Err(ConfigError::InvalidValue {
                field: "server.cors_enabled".to_string(),
                message: "CORS must be enabled outside development".to_string(),
            });
        }

        Ok(())
    }

    /// Apply the prompts file, if one is configured
    pub fn resolve_prompts(&mut self) -> Result<(), ConfigError> {
        if let Some(path) = &self.prompts_path {
            self.prompts = PromptsConfig::load_yaml(path)?;
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Upper bound on concurrently open chat sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle time after which a session is dropped
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_sessions() -> usize {
    1000
}
fn default_session_timeout_secs() -> u64 {
    1800
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            max_sessions: default_max_sessions(),
            session_timeout_secs: default_session_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

/// Remote completion service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_mobile_max_tokens")]
    pub mobile_max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Reply timeout for desktop clients
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Reply timeout for mobile clients
    #[serde(default = "default_mobile_timeout_ms")]
    pub mobile_timeout_ms: u64,

    /// Retries for network errors and timeouts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff, doubled per retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_endpoint() -> String {
    endpoints::TOGETHER_DEFAULT.to_string()
}
fn default_model() -> String {
    endpoints::DEFAULT_MODEL.to_string()
}
fn default_api_key_env() -> String {
    endpoints::DEFAULT_API_KEY_ENV.to_string()
}
fn default_max_tokens() -> usize {
    generation::MAX_TOKENS
}
fn default_mobile_max_tokens() -> usize {
    generation::MOBILE_MAX_TOKENS
}
fn default_temperature() -> f32 {
    generation::TEMPERATURE
}
fn default_timeout_ms() -> u64 {
    timeouts::DESKTOP_MS
}
fn default_mobile_timeout_ms() -> u64 {
    timeouts::MOBILE_MS
}
fn default_max_retries() -> u32 {
    1
}
fn default_initial_backoff_ms() -> u64 {
    timeouts::INITIAL_BACKOFF_MS
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            mobile_max_tokens: default_mobile_max_tokens(),
            temperature: default_temperature(),
            timeout_ms: default_timeout_ms(),
            mobile_timeout_ms: default_mobile_timeout_ms(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

impl LlmSettings {
    /// Read the API key from the process environment
    ///
    /// Empty values count as missing.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn mobile_timeout(&self) -> Duration {
        Duration::from_millis(self.mobile_timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

/// Where the bot's reply comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    /// Remote completion service with canned fallback
    #[default]
    Llm,
    /// Turn-indexed scripted replies, no remote reply call
    Scripted,
}

/// How lead analysis is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStrategy {
    /// Keyword extractor + score model + policy
    #[default]
    Local,
    /// Strict-JSON analysis prompt, falling back to local
    Remote,
}

/// Conversation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub mode: EngineMode,

    #[serde(default)]
    pub analysis_strategy: AnalysisStrategy,

    #[serde(default = "default_analysis_max_tokens")]
    pub analysis_max_tokens: usize,

    #[serde(default = "default_analysis_temperature")]
    pub analysis_temperature: f32,

    /// Utterances longer than this skip the local extractor
    #[serde(default = "default_max_analysis_chars")]
    pub max_analysis_chars: usize,
}

fn default_analysis_max_tokens() -> usize {
    generation::ANALYSIS_MAX_TOKENS
}
fn default_analysis_temperature() -> f32 {
    generation::ANALYSIS_TEMPERATURE
}
fn default_max_analysis_chars() -> usize {
    analysis::MAX_ANALYSIS_CHARS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: EngineMode::default(),
            analysis_strategy: AnalysisStrategy::default(),
            analysis_max_tokens: default_analysis_max_tokens(),
            analysis_temperature: default_analysis_temperature(),
            max_analysis_chars: default_max_analysis_chars(),
        }
    }
}

/// Lead capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CaptureConfig {
    /// JSON-lines file for captured leads; in-memory when unset
    #[serde(default)]
    pub path: Option<String>,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from `config/` and the environment
///
/// Priority: env vars (`LEAD_AGENT__SECTION__KEY`) > `config/{env}` >
/// `config/default` > built-in defaults.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Same as [`load_settings`] with an explicit config directory
pub fn load_settings_from(
    dir: impl AsRef<Path>,
    env: Option<&str>,
) -> Result<Settings, ConfigError> {
    let dir = dir.as_ref();
    let mut builder = Config::builder();

    builder = builder.add_source(File::from(dir.join("default")).required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::from(dir.join(env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("LEAD_AGENT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let mut settings: Settings = config.try_deserialize()?;

    settings.resolve_prompts()?;
    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.llm.endpoint, "https://api.together.xyz/v1");
        assert_eq!(settings.llm.max_tokens, 1000);
        assert_eq!(settings.llm.mobile_max_tokens, 300);
        assert_eq!(settings.engine.analysis_strategy, AnalysisStrategy::Local);
        assert_eq!(settings.engine.mode, EngineMode::Llm);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_mobile_timeout_is_shorter() {
        let llm = LlmSettings::default();
        assert!(llm.mobile_timeout() < llm.timeout());
    }

    #[test]
    fn test_llm_validation() {
        let mut settings = Settings::default();
        settings.llm.temperature = 3.0;
        assert!(settings.validate().is_err());
        settings.llm.temperature = 0.7;

        settings.llm.mobile_timeout_ms = settings.llm.timeout_ms + 1;
        assert!(settings.validate().is_err());
        settings.llm.mobile_timeout_ms = 5_000;

        settings.llm.timeout_ms = 0;
        assert!(settings.validate().is_err());
        settings.llm.timeout_ms = 20_000;

        settings.llm.endpoint = "api.together.xyz".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_engine_validation() {
        let mut settings = Settings::default();
        settings.engine.max_analysis_chars = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_strict_environment_requires_cors() {
        let mut settings = Settings::default();
        settings.server.cors_enabled = false;
        assert!(settings.validate().is_ok());

        settings.environment = RuntimeEnvironment::Production;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_api_key_missing_env() {
        let mut llm = LlmSettings::default();
        llm.api_key_env = "LEAD_AGENT_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        assert!(llm.api_key().is_none());
    }

    #[test]
    fn test_load_settings_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.toml")).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[llm]
model = "test-model"
mobile_timeout_ms = 3000

[engine]
analysis_strategy = "remote"
"#
        )
        .unwrap();

        let settings = load_settings_from(dir.path(), None).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.llm.model, "test-model");
        assert_eq!(settings.llm.mobile_timeout_ms, 3000);
        assert_eq!(settings.engine.analysis_strategy, AnalysisStrategy::Remote);
        // untouched sections keep defaults
        assert_eq!(settings.llm.max_tokens, 1000);
    }

    #[test]
    fn test_load_settings_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.toml")).unwrap();
        writeln!(file, "[llm]\ntemperature = 9.5").unwrap();

        let result = load_settings_from(dir.path(), None);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}

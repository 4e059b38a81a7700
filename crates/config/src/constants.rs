//! Centralized constants for the lead agent
//!
//! Single source of truth for default endpoints, model names and limits used
//! by the settings defaults and by tests.

/// Remote completion service
pub mod endpoints {
    /// Together AI OpenAI-compatible endpoint
    pub const TOGETHER_DEFAULT: &str = "https://api.together.xyz/v1";

    /// Default chat model
    pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.2-11B-Vision-Instruct-Turbo";

    /// Environment variable holding the bearer token
    pub const DEFAULT_API_KEY_ENV: &str = "TOGETHER_API_KEY";
}

/// Generation limits
pub mod generation {
    pub const MAX_TOKENS: usize = 1000;

    /// Shorter replies for phones
    pub const MOBILE_MAX_TOKENS: usize = 300;

    pub const TEMPERATURE: f32 = 0.7;

    /// Analysis replies must be near-deterministic JSON
    pub const ANALYSIS_TEMPERATURE: f32 = 0.1;
    pub const ANALYSIS_MAX_TOKENS: usize = 400;
}

/// Request timeouts (milliseconds)
pub mod timeouts {
    pub const DESKTOP_MS: u64 = 20_000;
    pub const MOBILE_MS: u64 = 8_000;
    pub const INITIAL_BACKOFF_MS: u64 = 200;
}

/// Local analysis limits
pub mod analysis {
    /// Longest utterance the keyword extractor will scan
    pub const MAX_ANALYSIS_CHARS: usize = 2000;
}

//! Configuration management for the research agent.
//!
//! Configuration can be set via environment variables:
//! - `OPENROUTER_API_KEY` - Required. Your OpenRouter API key.
//! - `OPENROUTER_BASE_URL` - Optional. OpenAI-compatible chat completions endpoint.
//! - `DEFAULT_MODEL` - Optional. The model used for every stage. Defaults to `openai/gpt-3.5-turbo`.
//! - `COMPLETION_TEMPERATURE` - Optional. Sampling temperature. Defaults to `0.2`.
//! - `COMPLETION_MAX_TOKENS` - Optional. Maximum output tokens. Defaults to `800`.
//! - `RESEARCH_LANGUAGE` - Optional. Language tag for the final report. Defaults to `en`.
//! - `RESEARCH_VERBOSE` - Optional. Mirror status events to the log. Defaults to `false`.
//! - `RESEARCH_MAX_SOURCES` - Optional. Successful extractions per run. Defaults to `3`.
//! - `RESEARCH_QUERY_CONTEXT_CHARS` - Optional. Dependent output prefix used for the query. Defaults to `3500`.
//! - `RESEARCH_EXTRACT_CHARS` - Optional. Page content bound before extraction. Defaults to `20000`.
//! - `RESEARCH_EXTRACT_CHUNK_CHARS` - Optional. Extractor chunk size. Defaults to `20000`.
//! - `RESEARCH_PREVIEW_CHARS` - Optional. Length of the relevant-info preview. Defaults to `100`.
//! - `TAVILY_API_KEY` - Optional. Enables Tavily search instead of DuckDuckGo.

use std::str::FromStr;

use thiserror::Error;

use crate::llm::ChatOptions;
use crate::util::env_var_bool;

pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Model parameters for a single completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u64,
    /// Nucleus sampling.
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 800,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

impl CompletionConfig {
    /// Same parameters, different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            temperature: Some(self.temperature),
            top_p: Some(self.top_p),
            max_tokens: Some(self.max_tokens),
            frequency_penalty: Some(self.frequency_penalty),
            presence_penalty: Some(self.presence_penalty),
        }
    }
}

/// Size bounds used by the research pipeline.
///
/// All values are in characters, except `max_sources`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchLimits {
    /// Successful extractions after which the acquisition loop stops.
    pub max_sources: usize,
    /// Prefix of the dependent task output fed into query derivation.
    pub query_context_chars: usize,
    /// Page content is truncated to this bound before extraction.
    pub extract_input_chars: usize,
    /// Content longer than this is extracted chunk by chunk.
    pub extract_chunk_chars: usize,
    /// Length of the relevant-info preview in status lines.
    pub preview_chars: usize,
}

impl Default for ResearchLimits {
    fn default() -> Self {
        Self {
            max_sources: 3,
            query_context_chars: 3500,
            extract_input_chars: 20_000,
            extract_chunk_chars: 20_000,
            preview_chars: 100,
        }
    }
}

/// Per-run settings for web research.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchSettings {
    pub completion: CompletionConfig,
    /// Output language tag for the synthesized report (e.g. `en`, `ja`).
    pub language: String,
    /// Mirror status events to the diagnostic log.
    pub verbose: bool,
    pub limits: ResearchLimits,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            completion: CompletionConfig::default(),
            language: "en".to_string(),
            verbose: false,
            limits: ResearchLimits::default(),
        }
    }
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenRouter API key
    pub api_key: String,

    /// Chat completions endpoint
    pub base_url: String,

    /// Tavily API key (DuckDuckGo is used when absent)
    pub tavily_api_key: Option<String>,

    /// Settings shared by every research run
    pub research: ResearchSettings,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENROUTER_API_KEY` is not set,
    /// and `ConfigError::InvalidValue` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string()))?;

        let base_url =
            std::env::var("OPENROUTER_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let tavily_api_key = std::env::var("TAVILY_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let defaults = CompletionConfig::default();
        let completion = CompletionConfig {
            model: std::env::var("DEFAULT_MODEL").unwrap_or(defaults.model),
            temperature: parse_env("COMPLETION_TEMPERATURE", defaults.temperature)?,
            max_tokens: parse_env("COMPLETION_MAX_TOKENS", defaults.max_tokens)?,
            ..defaults
        };

        let limit_defaults = ResearchLimits::default();
        let limits = ResearchLimits {
            max_sources: parse_env("RESEARCH_MAX_SOURCES", limit_defaults.max_sources)?,
            query_context_chars: parse_env(
                "RESEARCH_QUERY_CONTEXT_CHARS",
                limit_defaults.query_context_chars,
            )?,
            extract_input_chars: parse_env(
                "RESEARCH_EXTRACT_CHARS",
                limit_defaults.extract_input_chars,
            )?,
            extract_chunk_chars: parse_env(
                "RESEARCH_EXTRACT_CHUNK_CHARS",
                limit_defaults.extract_chunk_chars,
            )?,
            preview_chars: parse_env("RESEARCH_PREVIEW_CHARS", limit_defaults.preview_chars)?,
        };

        if limits.extract_chunk_chars == 0 {
            return Err(ConfigError::InvalidValue(
                "RESEARCH_EXTRACT_CHUNK_CHARS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let research = ResearchSettings {
            completion,
            language: std::env::var("RESEARCH_LANGUAGE").unwrap_or_else(|_| "en".to_string()),
            verbose: env_var_bool("RESEARCH_VERBOSE", false),
            limits,
        };

        Ok(Self {
            api_key,
            base_url,
            tavily_api_key,
            research,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, default_model: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            tavily_api_key: None,
            research: ResearchSettings {
                completion: CompletionConfig::default().with_model(default_model),
                ..ResearchSettings::default()
            },
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_defaults_are_low_variance() {
        let config = CompletionConfig::default();
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_tokens, 800);

        let options = config.chat_options();
        assert_eq!(options.top_p, Some(1.0));
        assert_eq!(options.frequency_penalty, Some(0.0));
        assert_eq!(options.presence_penalty, Some(0.0));
    }

    #[test]
    fn research_limits_defaults() {
        let limits = ResearchLimits::default();
        assert_eq!(limits.max_sources, 3);
        assert_eq!(limits.query_context_chars, 3500);
        assert_eq!(limits.extract_input_chars, 20_000);
        assert_eq!(limits.preview_chars, 100);
    }

    #[test]
    fn parse_env_reports_invalid_values() {
        std::env::set_var("RESEARCH_AGENT_TEST_BAD_NUMBER", "three");
        let err = parse_env::<usize>("RESEARCH_AGENT_TEST_BAD_NUMBER", 3).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(name, _) if name == "RESEARCH_AGENT_TEST_BAD_NUMBER"));
        std::env::remove_var("RESEARCH_AGENT_TEST_BAD_NUMBER");

        assert_eq!(parse_env::<usize>("RESEARCH_AGENT_TEST_UNSET", 7).unwrap(), 7);
    }

    #[test]
    fn new_config_overrides_model_only() {
        let config = Config::new("key".to_string(), "anthropic/claude-3-haiku".to_string());
        assert_eq!(config.research.completion.model, "anthropic/claude-3-haiku");
        assert_eq!(config.research.language, "en");
        assert!(config.tavily_api_key.is_none());
    }
}

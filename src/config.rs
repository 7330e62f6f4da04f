//! Runtime configuration.
//!
//! Values come from environment variables, fall back to the defaults below,
//! and are checked by [`CoachConfig::validate`]. CLI flags override them.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::interview::{
    GeneratorConfig, ScorerConfig, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MIN_ANSWER_CHARS,
    DEFAULT_QUESTION_COUNT, DEFAULT_TEMPERATURE,
};
use crate::llm::{
    GeminiProvider, LiteLlmClient, LlmProvider, DEFAULT_GEMINI_MODEL, DEFAULT_LITELLM_MODEL,
};

/// Default SQLite database location.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://interview_coach.db";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Which LLM backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmBackend {
    /// Any OpenAI-compatible `/chat/completions` endpoint.
    LiteLlm,
    /// Google's `generateContent` API.
    #[default]
    Gemini,
}

impl FromStr for LlmBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "litellm" | "openai" => Ok(LlmBackend::LiteLlm),
            "gemini" => Ok(LlmBackend::Gemini),
            other => Err(format!("expected 'litellm' or 'gemini', got '{}'", other)),
        }
    }
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmBackend::LiteLlm => write!(f, "litellm"),
            LlmBackend::Gemini => write!(f, "gemini"),
        }
    }
}

/// Settings for the coach.
#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub llm_backend: LlmBackend,
    pub litellm_api_base: Option<String>,
    pub litellm_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    /// Model override; `None` uses the backend's default.
    pub model: Option<String>,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub question_count: usize,
    pub min_answer_chars: usize,
    pub database_url: String,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            llm_backend: LlmBackend::default(),
            litellm_api_base: None,
            litellm_api_key: None,
            gemini_api_key: None,
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            question_count: DEFAULT_QUESTION_COUNT,
            min_answer_chars: DEFAULT_MIN_ANSWER_CHARS,
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

impl CoachConfig {
    /// Reads the configuration from the process environment.
    ///
    /// Recognized variables: `COACH_LLM_PROVIDER`, `LITELLM_API_BASE`,
    /// `LITELLM_API_KEY`, `GEMINI_API_KEY`, `COACH_MODEL`,
    /// `COACH_TEMPERATURE`, `COACH_MAX_OUTPUT_TOKENS`,
    /// `COACH_QUESTION_COUNT`, `COACH_MIN_ANSWER_CHARS`,
    /// `COACH_DATABASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed or the result
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CoachConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("COACH_LLM_PROVIDER") {
            config.llm_backend = val.parse().map_err(|message| ConfigError::InvalidValue {
                key: "COACH_LLM_PROVIDER".to_string(),
                message,
            })?;
        }

        config.litellm_api_base = lookup("LITELLM_API_BASE").filter(|v| !v.is_empty());
        config.litellm_api_key = lookup("LITELLM_API_KEY").filter(|v| !v.is_empty());
        config.gemini_api_key = lookup("GEMINI_API_KEY").filter(|v| !v.is_empty());
        config.model = lookup("COACH_MODEL").filter(|v| !v.is_empty());

        if let Some(val) = lookup("COACH_TEMPERATURE") {
            config.temperature = parse_env_value(&val, "COACH_TEMPERATURE")?;
        }

        if let Some(val) = lookup("COACH_MAX_OUTPUT_TOKENS") {
            config.max_output_tokens = parse_env_value(&val, "COACH_MAX_OUTPUT_TOKENS")?;
        }

        if let Some(val) = lookup("COACH_QUESTION_COUNT") {
            config.question_count = parse_env_value(&val, "COACH_QUESTION_COUNT")?;
        }

        if let Some(val) = lookup("COACH_MIN_ANSWER_CHARS") {
            config.min_answer_chars = parse_env_value(&val, "COACH_MIN_ANSWER_CHARS")?;
        }

        if let Some(val) = lookup("COACH_DATABASE_URL") {
            config.database_url = val;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// Credentials are checked later, by [`CoachConfig::build_llm`], so
    /// commands that never call the LLM work without them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.max_output_tokens == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_output_tokens must be greater than 0".to_string(),
            ));
        }

        if self.question_count == 0 {
            return Err(ConfigError::ValidationFailed(
                "question_count must be greater than 0".to_string(),
            ));
        }

        if self.database_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "database_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the backend.
    pub fn with_backend(mut self, backend: LlmBackend) -> Self {
        self.llm_backend = backend;
        self
    }

    /// Builder method to set the model override.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Builder method to set the database URL.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    /// The model that requests will use.
    pub fn effective_model(&self) -> &str {
        match (&self.model, self.llm_backend) {
            (Some(model), _) => model,
            (None, LlmBackend::Gemini) => DEFAULT_GEMINI_MODEL,
            (None, LlmBackend::LiteLlm) => DEFAULT_LITELLM_MODEL,
        }
    }

    /// Creates the configured LLM client.
    ///
    /// # Errors
    ///
    /// `ConfigError::MissingEnvVar` when the backend's credentials are absent.
    pub fn build_llm(&self) -> Result<Arc<dyn LlmProvider>, ConfigError> {
        let model = self.effective_model().to_string();
        match self.llm_backend {
            LlmBackend::Gemini => {
                let key = self
                    .gemini_api_key
                    .clone()
                    .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;
                Ok(Arc::new(GeminiProvider::with_model(key, model)))
            }
            LlmBackend::LiteLlm => {
                let base = self
                    .litellm_api_base
                    .clone()
                    .ok_or_else(|| ConfigError::MissingEnvVar("LITELLM_API_BASE".to_string()))?;
                Ok(Arc::new(LiteLlmClient::new(
                    base,
                    self.litellm_api_key.clone(),
                    model,
                )))
            }
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig::default()
            .with_question_count(self.question_count)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_output_tokens)
    }

    pub fn scorer_config(&self) -> ScorerConfig {
        ScorerConfig {
            temperature: self.temperature,
            max_tokens: Some(self.max_output_tokens),
            ..ScorerConfig::default()
        }
    }
}

/// Parse an environment variable value.
fn parse_env_value<T: FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

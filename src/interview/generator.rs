//! LLM-backed interview question generation.

use std::sync::Arc;

use crate::extraction::ResponseExtractor;
use crate::interview::form::ValidatedForm;
use crate::interview::types::Question;
use crate::llm::{GenerationRequest, LlmProvider, Message};
use crate::prompts::{build_question_prompt, INTERVIEWER_SYSTEM_PROMPT};

/// Default number of questions requested per interview.
pub const DEFAULT_QUESTION_COUNT: usize = 2;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default output token cap.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 256;

/// Configuration for the question generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Model name passed to the provider; empty uses the provider default.
    pub model: String,
    pub question_count: usize,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            question_count: DEFAULT_QUESTION_COUNT,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl GeneratorConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_question_count(mut self, count: usize) -> Self {
        self.question_count = count;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Asks the LLM for interview questions and extracts them from its reply.
pub struct QuestionGenerator {
    llm_client: Arc<dyn LlmProvider>,
    extractor: ResponseExtractor,
    config: GeneratorConfig,
}

impl std::fmt::Debug for QuestionGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl QuestionGenerator {
    pub fn new(llm_client: Arc<dyn LlmProvider>, config: GeneratorConfig) -> Self {
        Self {
            llm_client,
            extractor: ResponseExtractor::new(),
            config,
        }
    }

    pub fn with_defaults(llm_client: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm_client, GeneratorConfig::default())
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates questions for a validated form.
    ///
    /// Never fails: provider errors and unusable replies are logged and
    /// produce an empty vector, which callers treat as "nothing generated".
    pub async fn generate(&self, form: &ValidatedForm) -> Vec<Question> {
        let request = self.build_request(form);

        let response = match self.llm_client.generate(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, position = %form.position, "Question generation request failed");
                return Vec::new();
            }
        };

        let content = match response.first_content() {
            Some(content) if !content.trim().is_empty() => content,
            _ => {
                tracing::error!(response_id = %response.id, "LLM returned an empty response");
                return Vec::new();
            }
        };

        let questions = self.extractor.extract(content);
        tracing::debug!(
            requested = self.config.question_count,
            received = questions.len(),
            "Generated interview questions"
        );
        questions
    }

    fn build_request(&self, form: &ValidatedForm) -> GenerationRequest {
        let prompt = build_question_prompt(
            self.config.question_count,
            &form.position,
            &form.description,
            form.experience_years,
            &form.tech_stack_display(),
        );

        GenerationRequest::new(
            self.config.model.clone(),
            vec![
                Message::system(INTERVIEWER_SYSTEM_PROMPT),
                Message::user(prompt),
            ],
        )
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens)
        .with_json_output()
    }
}

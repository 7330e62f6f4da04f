//! LLM-backed scoring of a single answer.

use std::sync::Arc;

use crate::error::{CoachError, CoachResult};
use crate::extraction::{Score, ScoreParser};
use crate::interview::generator::DEFAULT_TEMPERATURE;
use crate::llm::{GenerationRequest, LlmProvider, Message};
use crate::prompts::{build_scoring_prompt, INTERVIEWER_SYSTEM_PROMPT};

/// Configuration for the answer scorer.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub model: String,
    pub temperature: f64,
    /// Output cap; `None` leaves it to the provider.
    pub max_tokens: Option<u32>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }
}

/// Compares a submitted answer with the expected one through the LLM.
pub struct AnswerScorer {
    llm_client: Arc<dyn LlmProvider>,
    config: ScorerConfig,
}

impl std::fmt::Debug for AnswerScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerScorer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AnswerScorer {
    pub fn new(llm_client: Arc<dyn LlmProvider>, config: ScorerConfig) -> Self {
        Self { llm_client, config }
    }

    pub fn with_defaults(llm_client: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm_client, ScorerConfig::default())
    }

    /// Scores `user_answer` against `expected_answer`.
    ///
    /// # Errors
    ///
    /// [`CoachError::ScoringFailed`] when the provider fails or its reply is
    /// not a well-formed score.
    pub async fn score(
        &self,
        question: &str,
        user_answer: &str,
        expected_answer: &str,
    ) -> CoachResult<Score> {
        let mut request = GenerationRequest::new(
            self.config.model.clone(),
            vec![
                Message::system(INTERVIEWER_SYSTEM_PROMPT),
                Message::user(build_scoring_prompt(question, user_answer, expected_answer)),
            ],
        )
        .with_temperature(self.config.temperature);
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.llm_client.generate(request).await.map_err(|e| {
            tracing::error!(error = %e, "Scoring request failed");
            CoachError::from(e)
        })?;

        let content = response
            .first_content()
            .ok_or_else(|| CoachError::ScoringFailed("Empty LLM response".to_string()))?;

        let score = ScoreParser::parse(content).map_err(|e| {
            tracing::error!(reason = %e.reason, "Score response was malformed");
            CoachError::from(e)
        })?;

        tracing::debug!(rating = score.rating, "Answer scored");
        Ok(score)
    }
}

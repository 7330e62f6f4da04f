//! Extraction of generated interview questions.

use serde_json::Value;

use super::strategies::{default_strategies, ExtractionStrategy};
use crate::interview::Question;

/// Turns raw generator output into a list of questions.
///
/// Runs its strategies in order and stops at the first one that yields an
/// array. Never fails: when nothing works it logs a diagnostic and returns an
/// empty list, which callers treat as "no questions".
pub struct ResponseExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl std::fmt::Debug for ResponseExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("ResponseExtractor")
            .field("strategies", &names)
            .finish()
    }
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseExtractor {
    /// Creates an extractor with the standard direct / fenced / bracket cascade.
    pub fn new() -> Self {
        Self {
            strategies: default_strategies(),
        }
    }

    /// Creates an extractor with a custom strategy order.
    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Extracts questions from `raw`.
    pub fn extract(&self, raw: &str) -> Vec<Question> {
        let trimmed = raw.trim();

        for strategy in &self.strategies {
            if let Some(Value::Array(items)) = strategy.try_extract(trimmed) {
                tracing::debug!(
                    strategy = strategy.name(),
                    items = items.len(),
                    "Extracted question array"
                );
                return items.into_iter().filter_map(to_question).collect();
            }
        }

        let preview_len = trimmed
            .char_indices()
            .nth(200)
            .map(|(i, _)| i)
            .unwrap_or(trimmed.len());
        tracing::warn!(
            raw_preview = %&trimmed[..preview_len],
            "No JSON array found in AI response after all extraction strategies"
        );
        Vec::new()
    }
}

/// Converts one array element, dropping anything without a usable question.
fn to_question(item: Value) -> Option<Question> {
    let question = match item.get("question").and_then(Value::as_str) {
        Some(q) if !q.trim().is_empty() => q.to_string(),
        _ => {
            tracing::debug!(element = %item, "Skipping array element without a question");
            return None;
        }
    };
    let answer = item
        .get("answer")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(Question { question, answer })
}

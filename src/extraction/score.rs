//! Parsing of answer scores returned by the LLM.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Lowest rating the scorer may return.
pub const MIN_RATING: u8 = 1;

/// Highest rating the scorer may return.
pub const MAX_RATING: u8 = 10;

/// A rating with its critique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub rating: u8,
    pub feedback: String,
}

/// The scorer's output could not be read as a score.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Malformed score response ({reason}). Cleaned text starts with: '{preview}'")]
pub struct MalformedScoreError {
    pub reason: String,
    pub preview: String,
}

impl MalformedScoreError {
    fn new(reason: impl Into<String>, cleaned: &str) -> Self {
        let end = cleaned
            .char_indices()
            .nth(100)
            .map(|(i, _)| i)
            .unwrap_or(cleaned.len());
        Self {
            reason: reason.into(),
            preview: cleaned[..end].to_string(),
        }
    }
}

fn fence_markers() -> &'static Regex {
    static MARKERS: OnceLock<Regex> = OnceLock::new();
    MARKERS.get_or_init(|| Regex::new(r"```json|```|`").expect("marker pattern is valid"))
}

/// Single-pass parser for `{"ratings": n, "feedback": "..."}` payloads.
pub struct ScoreParser;

impl ScoreParser {
    /// Strips fence markers and backticks, then parses the remainder.
    pub fn parse(raw: &str) -> Result<Score, MalformedScoreError> {
        let cleaned = fence_markers().replace_all(raw, "");
        let cleaned = cleaned.trim();

        let value: Value = serde_json::from_str(cleaned).map_err(|e| {
            tracing::error!(cleaned = %cleaned, error = %e, "Invalid JSON format after cleaning");
            MalformedScoreError::new(format!("invalid JSON: {}", e), cleaned)
        })?;

        let object = value
            .as_object()
            .ok_or_else(|| MalformedScoreError::new("top-level value is not an object", cleaned))?;

        let raw_rating = object
            .get("ratings")
            .or_else(|| object.get("rating"))
            .and_then(Value::as_f64)
            .ok_or_else(|| MalformedScoreError::new("missing numeric 'ratings' field", cleaned))?;

        let rounded = raw_rating.round();
        if !(f64::from(MIN_RATING)..=f64::from(MAX_RATING)).contains(&rounded) {
            return Err(MalformedScoreError::new(
                format!(
                    "rating {} outside {}..={}",
                    raw_rating, MIN_RATING, MAX_RATING
                ),
                cleaned,
            ));
        }

        let feedback = object
            .get("feedback")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| MalformedScoreError::new("missing non-empty 'feedback' field", cleaned))?;

        Ok(Score {
            rating: rounded as u8,
            feedback: feedback.to_string(),
        })
    }
}

//! Tolerant parsing of LLM output.
//!
//! The question generator is told to return a bare JSON array and the scorer a
//! bare JSON object, but models wrap payloads in prose or markdown fences.
//! This module is the only boundary between that loosely specified text and
//! the typed domain.
//!
//! # Strategies
//!
//! [`ResponseExtractor`] runs an ordered list of [`ExtractionStrategy`] values
//! and stops at the first success:
//! 1. Direct parse of the whole text
//! 2. The first fenced code block (optionally tagged `json`)
//! 3. The span from the first `[` to the last `]`
//!
//! [`ScoreParser`] does a single cleaning pass and fails with
//! [`MalformedScoreError`] instead of cascading.
//!
//! # Example
//!
//! ```
//! use interview_coach::extraction::{ResponseExtractor, ScoreParser};
//!
//! let questions = ResponseExtractor::new()
//!     .extract("Sure!\n```json\n[{\"question\":\"What is ownership?\",\"answer\":\"\"}]\n```");
//! assert_eq!(questions.len(), 1);
//!
//! let score = ScoreParser::parse("{\"ratings\": 8, \"feedback\": \"Clear.\"}").unwrap();
//! assert_eq!(score.rating, 8);
//! ```

pub mod questions;
pub mod score;
pub mod strategies;

pub use questions::ResponseExtractor;
pub use score::{MalformedScoreError, Score, ScoreParser};
pub use strategies::{
    default_strategies, BracketSpan, DirectParse, ExtractionStrategy, FencedBlock,
};

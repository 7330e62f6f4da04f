//! LLM provider implementations beyond the OpenAI-compatible client.

pub mod gemini;

pub use gemini::{GeminiProvider, DEFAULT_GEMINI_MODEL};

pub use super::types::LlmProvider;

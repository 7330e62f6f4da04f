//! LLM integration for interview-coach.
//!
//! Two backends sit behind the [`LlmProvider`] trait: [`LiteLlmClient`] for any
//! OpenAI-compatible endpoint and [`GeminiProvider`] for Google's
//! `generateContent` API.
//!
//! ```ignore
//! use interview_coach::llm::{GenerationRequest, LiteLlmClient, LlmProvider, Message};
//!
//! let client = LiteLlmClient::from_env()?;
//! let request = GenerationRequest::new("", vec![Message::user("Hello")])
//!     .with_temperature(0.7)
//!     .with_json_output();
//! let response = client.generate(request).await?;
//! ```

pub mod litellm;
pub mod providers;
pub mod types;

pub use litellm::{LiteLlmClient, DEFAULT_LITELLM_MODEL};
pub use providers::{GeminiProvider, DEFAULT_GEMINI_MODEL};
pub use types::{
    Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Role, Usage,
    JSON_MIME_TYPE,
};

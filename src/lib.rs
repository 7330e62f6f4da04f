//! interview-coach: mock interviews generated and scored by an LLM.
//!
//! A signed-in user describes a job, the coach asks the LLM for questions,
//! records spoken answers, scores them against the expected answers and
//! aggregates the scores into a feedback report.

pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod interview;
pub mod llm;
pub mod notify;
pub mod prompts;
pub mod routes;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use config::{CoachConfig, ConfigError, LlmBackend};
pub use error::{CoachError, CoachResult, LlmError, StoreError};
pub use interview::{AnswerSession, FeedbackReport, InterviewForm, InterviewService, InterviewSpec};
pub use routes::Route;
pub use session::{CurrentUser, SessionContext};

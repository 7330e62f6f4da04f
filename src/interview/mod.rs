//! The mock interview flow.
//!
//! - [`types`] - interviews, questions, answers and user profiles
//! - [`form`] - validation of the create / edit form
//! - [`lifecycle`] - interview and answer state machines
//! - [`generator`] - question generation through the LLM
//! - [`scorer`] - answer scoring through the LLM
//! - [`service`] - create, edit, delete, list and subscribe
//! - [`answer`] - record, score and save one answer
//! - [`feedback`] - the per-interview feedback report

pub mod answer;
pub mod feedback;
pub mod form;
pub mod generator;
pub mod lifecycle;
pub mod scorer;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use answer::{AnswerContext, AnswerSession, Devices, DEFAULT_MIN_ANSWER_CHARS};
pub use feedback::FeedbackReport;
pub use form::{split_tech_stack, InterviewForm, ValidatedForm};
pub use generator::{
    GeneratorConfig, QuestionGenerator, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_QUESTION_COUNT,
    DEFAULT_TEMPERATURE,
};
pub use lifecycle::{answer_lifecycle, interview_lifecycle, AnswerState, InterviewState, Lifecycle};
pub use scorer::{AnswerScorer, ScorerConfig};
pub use service::{Dashboard, InterviewService};
pub use types::{
    AnswerFilter, AnswerRecord, InterviewSpec, InterviewUpdate, NewAnswer, NewInterview,
    NewUserProfile, Question, UserProfile,
};

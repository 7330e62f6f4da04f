//! LLM prompts for the interview flow.
//!
//! - [`interview`] - question generation and answer scoring templates

pub mod interview;

pub use interview::{
    build_question_prompt, build_scoring_prompt, ANSWER_SCORING_PROMPT,
    INTERVIEWER_SYSTEM_PROMPT, QUESTION_GENERATION_PROMPT,
};

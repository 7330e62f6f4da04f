//! Core data types for interviews, answers and user profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single generated interview question with its expected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

/// A mock interview as stored in the `interviews` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSpec {
    pub id: String,
    pub position: String,
    pub description: String,
    #[serde(rename = "experience")]
    pub experience_years: u32,
    pub tech_stack: Vec<String>,
    pub questions: Vec<Question>,
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewSpec {
    /// Finds the question whose text matches `text` verbatim.
    pub fn question(&self, text: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.question == text)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Comma-joined tech stack, as it appears in prompts and forms.
    pub fn tech_stack_display(&self) -> String {
        self.tech_stack.join(", ")
    }
}

/// Fields supplied when inserting a new interview; the store assigns the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInterview {
    pub position: String,
    pub description: String,
    pub experience_years: u32,
    pub tech_stack: Vec<String>,
    pub questions: Vec<Question>,
    pub owner_id: String,
}

/// Full replacement of an interview's editable fields.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewUpdate {
    pub position: String,
    pub description: String,
    pub experience_years: u32,
    pub tech_stack: Vec<String>,
    pub questions: Vec<Question>,
}

/// A scored answer as stored in the `userAnswers` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub id: String,
    #[serde(rename = "mockIdRef")]
    pub interview_id: String,
    pub question: String,
    #[serde(rename = "correct_ans")]
    pub expected_answer: String,
    #[serde(rename = "user_ans")]
    pub submitted_answer: String,
    #[serde(rename = "feedback")]
    pub feedback_text: String,
    pub rating: u8,
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when inserting a new answer.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnswer {
    pub interview_id: String,
    pub question: String,
    pub expected_answer: String,
    pub submitted_answer: String,
    pub feedback_text: String,
    pub rating: u8,
    pub owner_id: String,
}

/// Equality filter over the `userAnswers` collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerFilter {
    pub owner_id: Option<String>,
    pub interview_id: Option<String>,
    pub question: Option<String>,
}

impl AnswerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_interview(mut self, interview_id: impl Into<String>) -> Self {
        self.interview_id = Some(interview_id.into());
        self
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    /// Whether `record` satisfies every set field.
    pub fn matches(&self, record: &AnswerRecord) -> bool {
        self.owner_id.as_deref().map_or(true, |v| v == record.owner_id)
            && self
                .interview_id
                .as_deref()
                .map_or(true, |v| v == record.interview_id)
            && self.question.as_deref().map_or(true, |v| v == record.question)
    }
}

/// A user profile as stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub email: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a profile on first sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserProfile {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub image_url: String,
}

//! Error types for interview-coach operations.
//!
//! Defines the error types shared across subsystems:
//! - LLM API interactions
//! - Document store reads and writes
//! - The user-facing taxonomy surfaced as notifications

use thiserror::Error;

use crate::extraction::MalformedScoreError;
use crate::notify::{Notification, NotificationLevel};

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: {0} environment variable not set")]
    MissingApiKey(String),

    #[error("Missing API base URL: LITELLM_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Response blocked by provider: {0}")]
    Blocked(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors raised by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection to the backing database failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    /// Document not found.
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Serialization/deserialization error for embedded JSON fields.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing database refused access.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Stored value could not be decoded into a domain type.
    #[error("Corrupt document {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// The user-facing error taxonomy.
///
/// Every variant is caught at the operation that initiated it and surfaced
/// through [`CoachError::notification`]; nothing is retried automatically.
#[derive(Debug, Error)]
pub enum CoachError {
    /// The LLM returned text no recovery strategy could use.
    #[error("AI response malformed: {0}")]
    AiResponseMalformed(String),

    /// Scoring an answer failed, either at the provider or while parsing.
    #[error("Answer scoring failed: {0}")]
    ScoringFailed(String),

    /// A document store operation failed.
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),

    /// Form-level validation failed.
    #[error("{title}: {description}")]
    Validation { title: String, description: String },

    /// The referenced interview or document is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An answer for this (user, interview, question) already exists.
    #[error("Question already answered: {0}")]
    AlreadyAnswered(String),

    /// The operation needs a signed-in user.
    #[error("Not signed in")]
    Unauthenticated,

    /// A lifecycle transition that the state table does not allow.
    #[error("Invalid state transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },
}

impl CoachError {
    /// Shorthand for a validation failure.
    pub fn validation(title: impl Into<String>, description: impl Into<String>) -> Self {
        CoachError::Validation {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Maps the error to the transient notification shown to the user.
    pub fn notification(&self) -> Notification {
        match self {
            CoachError::AiResponseMalformed(_) => Notification::new(
                NotificationLevel::Warning,
                "Could not generate questions.",
                "The AI did not provide a valid response. Please try again.",
            ),
            CoachError::ScoringFailed(_) => Notification::new(
                NotificationLevel::Error,
                "AI Feedback Error",
                "An error occurred while generating feedback.",
            ),
            CoachError::Persistence(err) => Notification::new(
                NotificationLevel::Error,
                "Error..",
                format!("Something went wrong: {}", err),
            ),
            CoachError::Validation { title, description } => {
                Notification::new(NotificationLevel::Error, title.clone(), description.clone())
            }
            CoachError::NotFound(what) => {
                Notification::new(NotificationLevel::Error, "Error", format!("{} not found.", what))
            }
            CoachError::AlreadyAnswered(_) => Notification::new(
                NotificationLevel::Info,
                "You have already answered this question.",
                "",
            ),
            CoachError::Unauthenticated => Notification::new(
                NotificationLevel::Error,
                "Not signed in",
                "Please sign in to continue.",
            ),
            CoachError::InvalidTransition { from, to } => Notification::new(
                NotificationLevel::Error,
                "Error..",
                format!("Cannot move from {} to {}.", from, to),
            ),
        }
    }
}

impl From<MalformedScoreError> for CoachError {
    fn from(err: MalformedScoreError) -> Self {
        CoachError::ScoringFailed(err.to_string())
    }
}

impl From<LlmError> for CoachError {
    fn from(err: LlmError) -> Self {
        CoachError::ScoringFailed(err.to_string())
    }
}

/// Result type alias for coach operations.
pub type CoachResult<T> = Result<T, CoachError>;

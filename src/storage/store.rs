//! The document store abstraction.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::interview::{
    AnswerFilter, AnswerRecord, InterviewSpec, InterviewUpdate, NewAnswer, NewInterview,
    NewUserProfile, UserProfile,
};
use crate::storage::subscription::Subscription;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A document database with the three collections the coach needs.
///
/// Implementations assign ids (UUID v4) and timestamps at write time and
/// push a fresh snapshot to every live [`Subscription`] of the affected
/// owner after each interview write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_interview(&self, new: NewInterview) -> StoreResult<InterviewSpec>;

    async fn get_interview(&self, id: &str) -> StoreResult<Option<InterviewSpec>>;

    /// Replaces the editable fields and bumps `updated_at`.
    ///
    /// Fails with [`StoreError::NotFound`] when `id` does not exist.
    async fn update_interview(&self, id: &str, update: InterviewUpdate)
        -> StoreResult<InterviewSpec>;

    /// Removes the interview. Answers referencing it are left in place.
    async fn delete_interview(&self, id: &str) -> StoreResult<()>;

    /// Interviews owned by `owner_id`, newest first.
    async fn list_interviews(&self, owner_id: &str) -> StoreResult<Vec<InterviewSpec>>;

    /// Registers a listener for `owner_id`'s interviews.
    ///
    /// The current snapshot is queued before this returns.
    async fn subscribe_interviews(&self, owner_id: &str) -> StoreResult<Subscription>;

    async fn insert_answer(&self, new: NewAnswer) -> StoreResult<AnswerRecord>;

    /// Answers matching every field set in `filter`, oldest first.
    async fn find_answers(&self, filter: &AnswerFilter) -> StoreResult<Vec<AnswerRecord>>;

    async fn get_user(&self, id: &str) -> StoreResult<Option<UserProfile>>;

    async fn insert_user(&self, new: NewUserProfile) -> StoreResult<UserProfile>;
}

pub(crate) fn new_document_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

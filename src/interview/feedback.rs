//! Aggregated feedback for one interview.

use std::sync::Arc;

use crate::error::{CoachError, CoachResult};
use crate::interview::types::{AnswerFilter, AnswerRecord, InterviewSpec};
use crate::session::SessionContext;
use crate::storage::{DocumentStore, ScopedFetch};

/// An interview together with the current user's scored answers.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackReport {
    pub interview: InterviewSpec,
    pub answers: Vec<AnswerRecord>,
}

impl FeedbackReport {
    /// Loads the interview and the user's answers to it concurrently.
    ///
    /// Both reads are [`ScopedFetch`]es: dropping the returned future before
    /// it resolves aborts them.
    pub async fn load(
        store: Arc<dyn DocumentStore>,
        session: &SessionContext,
        interview_id: &str,
    ) -> CoachResult<Self> {
        let user = session.require_user()?;

        let interview_fetch = {
            let store = Arc::clone(&store);
            let id = interview_id.to_string();
            ScopedFetch::spawn(async move { store.get_interview(&id).await })
        };
        let answers_fetch = {
            let store = Arc::clone(&store);
            let filter = AnswerFilter::new()
                .with_owner(user.id.clone())
                .with_interview(interview_id);
            ScopedFetch::spawn(async move { store.find_answers(&filter).await })
        };

        let (interview, answers) = tokio::join!(interview_fetch, answers_fetch);
        let interview = interview.map_err(fetch_failed)??;
        let answers = answers.map_err(fetch_failed)??;

        let interview = interview
            .filter(|i| i.is_owned_by(&user.id))
            .ok_or_else(|| CoachError::NotFound(format!("Interview {}", interview_id)))?;

        tracing::debug!(interview = %interview.id, answers = answers.len(), "Feedback loaded");
        Ok(Self { interview, answers })
    }

    /// Mean rating with one decimal, `"0.0"` when nothing was answered.
    pub fn overall_rating(&self) -> String {
        if self.answers.is_empty() {
            return "0.0".to_string();
        }
        let total: u32 = self.answers.iter().map(|a| u32::from(a.rating)).sum();
        format!("{:.1}", f64::from(total) / self.answers.len() as f64)
    }

    /// Whether at least one question was answered.
    pub fn is_complete(&self) -> bool {
        !self.answers.is_empty()
    }
}

fn fetch_failed(e: tokio::task::JoinError) -> CoachError {
    tracing::error!(error = %e, "Feedback fetch did not complete");
    CoachError::Persistence(crate::error::StoreError::ConnectionFailed(e.to_string()))
}

//! Recording, scoring and saving the answer to one question.

use std::sync::Arc;

use crate::capture::{Camera, SpeechSynthesizer, SpeechToText};
use crate::error::{CoachError, CoachResult};
use crate::extraction::Score;
use crate::interview::lifecycle::{answer_lifecycle, AnswerState, Lifecycle};
use crate::interview::scorer::AnswerScorer;
use crate::interview::types::{AnswerFilter, AnswerRecord, InterviewSpec, NewAnswer, Question};
use crate::notify::{surface, Notification, Notifier};
use crate::session::SessionContext;
use crate::storage::DocumentStore;

/// Default minimum length of a recorded answer, in characters.
pub const DEFAULT_MIN_ANSWER_CHARS: usize = 30;

/// The devices an answer session drives.
pub struct Devices {
    pub speech: Box<dyn SpeechToText>,
    pub voice: Arc<dyn SpeechSynthesizer>,
    pub camera: Box<dyn Camera>,
}

/// Shared services an answer session needs.
#[derive(Clone)]
pub struct AnswerContext {
    pub store: Arc<dyn DocumentStore>,
    pub scorer: Arc<AnswerScorer>,
    pub notifier: Arc<dyn Notifier>,
    pub min_answer_chars: usize,
}

/// State of answering a single question.
///
/// Scoring runs while the session is still `Recording`; the state only moves
/// on once the scorer has returned.
pub struct AnswerSession {
    interview_id: String,
    question: Question,
    state: AnswerState,
    lifecycle: Lifecycle<AnswerState>,
    answer_text: String,
    score: Option<Score>,
    devices: Devices,
    ctx: AnswerContext,
}

impl std::fmt::Debug for AnswerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerSession")
            .field("interview_id", &self.interview_id)
            .field("question", &self.question.question)
            .field("state", &self.state)
            .field("score", &self.score)
            .finish_non_exhaustive()
    }
}

impl AnswerSession {
    /// Opens a session for `question_text`, which must match one of the
    /// interview's questions verbatim.
    pub fn open(
        interview: &InterviewSpec,
        question_text: &str,
        devices: Devices,
        ctx: AnswerContext,
    ) -> CoachResult<Self> {
        let question = interview.question(question_text).cloned().ok_or_else(|| {
            CoachError::NotFound(format!(
                "Question '{}' in interview {}",
                question_text, interview.id
            ))
        })?;

        Ok(Self {
            interview_id: interview.id.clone(),
            question,
            state: AnswerState::Unanswered,
            lifecycle: answer_lifecycle(),
            answer_text: String::new(),
            score: None,
            devices,
            ctx,
        })
    }

    pub fn state(&self) -> AnswerState {
        self.state
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn score(&self) -> Option<&Score> {
        self.score.as_ref()
    }

    /// The transcript of the last finished recording.
    pub fn answer_text(&self) -> &str {
        &self.answer_text
    }

    pub fn is_camera_enabled(&self) -> bool {
        self.devices.camera.is_enabled()
    }

    /// Starts recording, or stops it and scores the transcript.
    ///
    /// Stopping with fewer than the minimum characters fails with
    /// "Answer is too short" without calling the scorer.
    pub async fn toggle_recording(&mut self) -> CoachResult<AnswerState> {
        let result = match self.state {
            AnswerState::Recording => self.finish_recording().await,
            AnswerState::Unanswered | AnswerState::Scored => self.start_recording().await,
            AnswerState::Saved => Err(CoachError::InvalidTransition {
                from: format!("{:?}", AnswerState::Saved),
                to: format!("{:?}", AnswerState::Recording),
            }),
        };
        surface(self.ctx.notifier.as_ref(), result.map(|_| self.state))
    }

    /// Drops the current transcript and score and records again.
    pub async fn reset(&mut self) -> CoachResult<()> {
        let result = self.start_recording().await;
        surface(self.ctx.notifier.as_ref(), result)
    }

    async fn start_recording(&mut self) -> CoachResult<()> {
        if self.state == AnswerState::Recording {
            self.devices.speech.stop().await?;
        }
        if self.state != AnswerState::Unanswered {
            self.lifecycle
                .transition(&mut self.state, AnswerState::Unanswered)?;
        }
        self.answer_text.clear();
        self.score = None;

        self.devices.speech.start().await?;
        self.lifecycle
            .transition(&mut self.state, AnswerState::Recording)?;
        tracing::debug!(question = %self.question.question, "Recording started");
        Ok(())
    }

    async fn finish_recording(&mut self) -> CoachResult<()> {
        let transcript = self.devices.speech.stop().await?;
        self.answer_text = transcript.joined();

        let length = self.answer_text.chars().count();
        if length < self.ctx.min_answer_chars {
            self.lifecycle
                .transition(&mut self.state, AnswerState::Unanswered)?;
            tracing::debug!(length, "Recorded answer too short");
            return Err(CoachError::validation(
                "Answer is too short",
                format!(
                    "Please provide an answer longer than {} characters.",
                    self.ctx.min_answer_chars
                ),
            ));
        }

        let scored = self
            .ctx
            .scorer
            .score(
                &self.question.question,
                &self.answer_text,
                &self.question.answer,
            )
            .await;

        match scored {
            Ok(score) => {
                self.score = Some(score);
                self.lifecycle.transition(&mut self.state, AnswerState::Scored)
            }
            Err(e) => {
                self.lifecycle
                    .transition(&mut self.state, AnswerState::Unanswered)?;
                Err(e)
            }
        }
    }

    /// Persists the scored answer unless one already exists for this
    /// (user, interview, question).
    ///
    /// The existence check and the insert are separate store calls, so two
    /// concurrent saves can both pass the check and write twice.
    pub async fn save(&mut self, session: &SessionContext) -> CoachResult<AnswerRecord> {
        let result = self.save_inner(session).await;
        if let Err(CoachError::Persistence(e)) = &result {
            tracing::error!(error = %e, "Error saving answer");
        }
        surface(self.ctx.notifier.as_ref(), result)
    }

    async fn save_inner(&mut self, session: &SessionContext) -> CoachResult<AnswerRecord> {
        let user = session.require_user()?;

        if self.question.answer.trim().is_empty() {
            return Err(CoachError::validation(
                "System Error: Missing Expected Answer",
                "The expected answer for this question was not found.",
            ));
        }

        let score = match (&self.score, self.state) {
            (Some(score), AnswerState::Scored) => score.clone(),
            _ => {
                return Err(CoachError::InvalidTransition {
                    from: format!("{:?}", self.state),
                    to: format!("{:?}", AnswerState::Saved),
                })
            }
        };

        let filter = AnswerFilter::new()
            .with_owner(user.id.clone())
            .with_interview(self.interview_id.clone())
            .with_question(self.question.question.clone());
        if !self.ctx.store.find_answers(&filter).await?.is_empty() {
            return Err(CoachError::AlreadyAnswered(self.question.question.clone()));
        }

        let record = self
            .ctx
            .store
            .insert_answer(NewAnswer {
                interview_id: self.interview_id.clone(),
                question: self.question.question.clone(),
                expected_answer: self.question.answer.clone(),
                submitted_answer: self.answer_text.clone(),
                feedback_text: score.feedback,
                rating: score.rating,
                owner_id: user.id.clone(),
            })
            .await?;

        self.lifecycle.transition(&mut self.state, AnswerState::Saved)?;
        self.answer_text.clear();
        self.score = None;

        tracing::info!(answer = %record.id, rating = record.rating, "Answer saved");
        self.ctx.notifier.notify(Notification::success(
            "Your answer has been saved successfully.",
            "",
        ));
        Ok(record)
    }

    /// Reads the question aloud, cutting off anything still being spoken.
    pub fn speak_question(&self) {
        self.devices.voice.speak(&self.question.question);
    }

    pub fn stop_speaking(&self) {
        self.devices.voice.cancel();
    }

    /// Turns the camera on or off. Refused while recording or scoring.
    pub fn toggle_camera(&mut self) -> CoachResult<bool> {
        let result = if self.state == AnswerState::Recording {
            Err(CoachError::validation(
                "Webcam is busy",
                "The webcam cannot be toggled while recording or generating feedback.",
            ))
        } else if self.devices.camera.is_enabled() {
            self.devices.camera.disable();
            Ok(false)
        } else {
            self.devices.camera.enable().map(|_| true)
        };
        surface(self.ctx.notifier.as_ref(), result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{ConsoleSynthesizer, NullCamera, ScriptedTranscriber};
    use crate::interview::testing::ScriptedLlm;
    use crate::interview::types::NewInterview;
    use crate::notify::{CollectingNotifier, NotificationLevel};
    use crate::session::CurrentUser;
    use crate::storage::MemoryStore;

    const LONG_ANSWER: &str = "A trait object erases the concrete type behind a vtable";
    const SCORE_REPLY: &str = r#"{"ratings": 7, "feedback": "Mention object safety."}"#;

    struct Harness {
        store: Arc<MemoryStore>,
        llm: Arc<ScriptedLlm>,
        notifier: Arc<CollectingNotifier>,
        interview: InterviewSpec,
        session: SessionContext,
    }

    async fn harness(replies: Vec<&str>, expected_answer: &str) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let interview = store
            .insert_interview(NewInterview {
                position: "Rust Engineer".to_string(),
                description: "Works on the compiler".to_string(),
                experience_years: 5,
                tech_stack: vec!["Rust".to_string()],
                questions: vec![Question {
                    question: "What is a trait object?".to_string(),
                    answer: expected_answer.to_string(),
                }],
                owner_id: "u1".to_string(),
            })
            .await
            .unwrap();
        Harness {
            store,
            llm: Arc::new(ScriptedLlm::replying(replies)),
            notifier: Arc::new(CollectingNotifier::new()),
            interview,
            session: SessionContext::SignedIn(CurrentUser::new("u1")),
        }
    }

    fn open(h: &Harness, recordings: Vec<Vec<&str>>) -> AnswerSession {
        let devices = Devices {
            speech: Box::new(ScriptedTranscriber::new(recordings)),
            voice: Arc::new(ConsoleSynthesizer::new()),
            camera: Box::new(NullCamera::enabled()),
        };
        let ctx = AnswerContext {
            store: h.store.clone(),
            scorer: Arc::new(AnswerScorer::with_defaults(h.llm.clone())),
            notifier: h.notifier.clone(),
            min_answer_chars: DEFAULT_MIN_ANSWER_CHARS,
        };
        AnswerSession::open(&h.interview, "What is a trait object?", devices, ctx).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_question_is_not_found() {
        let h = harness(vec![], "x").await;
        let devices = Devices {
            speech: Box::new(ScriptedTranscriber::default()),
            voice: Arc::new(ConsoleSynthesizer::new()),
            camera: Box::new(NullCamera::new()),
        };
        let ctx = AnswerContext {
            store: h.store.clone(),
            scorer: Arc::new(AnswerScorer::with_defaults(h.llm.clone())),
            notifier: h.notifier.clone(),
            min_answer_chars: DEFAULT_MIN_ANSWER_CHARS,
        };
        let err = AnswerSession::open(&h.interview, "what is a trait object?", devices, ctx)
            .unwrap_err();
        assert!(matches!(err, CoachError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_short_answer_never_reaches_scorer() {
        let h = harness(vec![SCORE_REPLY], "Dynamic dispatch").await;
        let mut answer = open(&h, vec![vec!["too", "short"]]);

        assert_eq!(answer.toggle_recording().await.unwrap(), AnswerState::Recording);
        let err = answer.toggle_recording().await.unwrap_err();

        assert!(matches!(err, CoachError::Validation { ref title, .. } if title == "Answer is too short"));
        assert_eq!(answer.state(), AnswerState::Unanswered);
        assert_eq!(h.llm.call_count(), 0);
        let note = h.notifier.last().expect("notified");
        assert_eq!(note.level, NotificationLevel::Error);
        assert_eq!(note.title, "Answer is too short");
    }

    #[tokio::test]
    async fn test_record_score_save_then_duplicate() {
        let h = harness(vec![SCORE_REPLY, SCORE_REPLY], "Dynamic dispatch").await;

        let mut first = open(&h, vec![vec![LONG_ANSWER]]);
        first.toggle_recording().await.unwrap();
        assert_eq!(first.toggle_recording().await.unwrap(), AnswerState::Scored);
        assert_eq!(first.score().map(|s| s.rating), Some(7));
        assert_eq!(first.answer_text(), LONG_ANSWER);

        let record = first.save(&h.session).await.unwrap();
        assert_eq!(record.rating, 7);
        assert_eq!(record.submitted_answer, LONG_ANSWER);
        assert_eq!(record.expected_answer, "Dynamic dispatch");
        assert_eq!(first.state(), AnswerState::Saved);
        let saved = h.notifier.last().expect("notified");
        assert_eq!(saved.title, "Your answer has been saved successfully.");
        assert!(saved.description.is_empty());

        let mut second = open(&h, vec![vec![LONG_ANSWER]]);
        second.toggle_recording().await.unwrap();
        second.toggle_recording().await.unwrap();
        let err = second.save(&h.session).await.unwrap_err();
        assert!(matches!(err, CoachError::AlreadyAnswered(_)));
        assert_eq!(second.state(), AnswerState::Scored);
        assert_eq!(
            h.notifier.last().map(|n| n.level),
            Some(NotificationLevel::Info)
        );

        let all = h.store.find_answers(&AnswerFilter::new()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_expected_answer_blocks_save() {
        let h = harness(vec![SCORE_REPLY], "").await;
        let mut answer = open(&h, vec![vec![LONG_ANSWER]]);
        answer.toggle_recording().await.unwrap();
        answer.toggle_recording().await.unwrap();

        let err = answer.save(&h.session).await.unwrap_err();
        assert!(
            matches!(err, CoachError::Validation { ref title, .. } if title == "System Error: Missing Expected Answer")
        );
        assert!(h.store.find_answers(&AnswerFilter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scoring_failure_returns_to_unanswered() {
        let h = harness(vec!["not json at all"], "Dynamic dispatch").await;
        let mut answer = open(&h, vec![vec![LONG_ANSWER]]);
        answer.toggle_recording().await.unwrap();

        let err = answer.toggle_recording().await.unwrap_err();
        assert!(matches!(err, CoachError::ScoringFailed(_)));
        assert_eq!(answer.state(), AnswerState::Unanswered);
        assert_eq!(
            h.notifier.last().map(|n| n.title),
            Some("AI Feedback Error".to_string())
        );
    }

    #[tokio::test]
    async fn test_reset_discards_score() {
        let h = harness(vec![SCORE_REPLY], "Dynamic dispatch").await;
        let mut answer = open(&h, vec![vec![LONG_ANSWER]]);
        answer.toggle_recording().await.unwrap();
        answer.toggle_recording().await.unwrap();
        assert!(answer.score().is_some());

        answer.reset().await.unwrap();
        assert_eq!(answer.state(), AnswerState::Recording);
        assert!(answer.score().is_none());
        assert_eq!(answer.answer_text(), "");
    }

    #[tokio::test]
    async fn test_save_requires_score_and_sign_in() {
        let h = harness(vec![], "Dynamic dispatch").await;
        let mut answer = open(&h, vec![]);
        assert!(matches!(
            answer.save(&h.session).await,
            Err(CoachError::InvalidTransition { .. })
        ));
        assert!(matches!(
            answer.save(&SessionContext::SignedOut).await,
            Err(CoachError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_camera_refused_while_recording() {
        let h = harness(vec![], "Dynamic dispatch").await;
        let mut answer = open(&h, vec![]);
        assert!(answer.is_camera_enabled());
        assert!(!answer.toggle_camera().unwrap());
        assert!(answer.toggle_camera().unwrap());

        answer.toggle_recording().await.unwrap();
        assert!(answer.toggle_camera().is_err());
        assert!(answer.is_camera_enabled());
    }
}

//! Create, edit, delete and read interviews on behalf of the signed-in user.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::capture::Camera;
use crate::error::{CoachError, CoachResult};
use crate::interview::answer::{AnswerContext, AnswerSession, Devices};
use crate::interview::form::{InterviewForm, ValidatedForm};
use crate::interview::generator::QuestionGenerator;
use crate::interview::lifecycle::{interview_lifecycle, InterviewState, Lifecycle};
use crate::interview::types::{AnswerFilter, InterviewSpec, InterviewUpdate, NewInterview, Question};
use crate::notify::{surface, Notification, Notifier};
use crate::session::SessionContext;
use crate::storage::{DocumentStore, Subscription};

/// What the dashboard shows: the user's interviews and which of them have
/// at least one saved answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub interviews: Vec<InterviewSpec>,
    pub answered: HashSet<String>,
}

impl Dashboard {
    /// `true` means the dashboard offers "View Feedback" instead of "Start".
    pub fn has_answers(&self, interview_id: &str) -> bool {
        self.answered.contains(interview_id)
    }
}

/// Interview operations. Every call needs a signed-in [`SessionContext`]
/// and reports its outcome through the notifier.
pub struct InterviewService {
    store: Arc<dyn DocumentStore>,
    generator: QuestionGenerator,
    notifier: Arc<dyn Notifier>,
    lifecycle: Lifecycle<InterviewState>,
    /// Interviews touched by this service whose state differs from a
    /// settled `QuestionsReady`: edits in flight and deletions.
    states: Mutex<HashMap<String, InterviewState>>,
}

impl std::fmt::Debug for InterviewService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterviewService")
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}

impl InterviewService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        generator: QuestionGenerator,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            generator,
            notifier,
            lifecycle: interview_lifecycle(),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Tracked state of a stored interview. Untracked means settled.
    pub fn state_of(&self, interview_id: &str) -> InterviewState {
        self.states
            .lock()
            .expect("lock not poisoned")
            .get(interview_id)
            .copied()
            .unwrap_or(InterviewState::QuestionsReady)
    }

    /// Moves a stored interview to `to`, refusing moves the lifecycle
    /// table does not allow from its tracked state.
    fn advance(&self, interview_id: &str, to: InterviewState) -> CoachResult<()> {
        let mut states = self.states.lock().expect("lock not poisoned");
        let state = states
            .entry(interview_id.to_string())
            .or_insert(InterviewState::QuestionsReady);
        self.lifecycle.transition(state, to)
    }

    fn abandon_delete(&self, interview_id: &str) {
        let mut states = self.states.lock().expect("lock not poisoned");
        if states.get(interview_id) == Some(&InterviewState::Deleted) {
            states.remove(interview_id);
        }
    }

    /// Forgets an edit that did not go through; the stored record stands.
    fn abandon_edit(&self, interview_id: &str) {
        let mut states = self.states.lock().expect("lock not poisoned");
        if states.get(interview_id) != Some(&InterviewState::Deleted) {
            states.remove(interview_id);
        }
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }

    /// Validates the form, generates questions and stores the interview.
    ///
    /// Nothing is stored when generation yields no questions.
    pub async fn create(
        &self,
        session: &SessionContext,
        form: &InterviewForm,
    ) -> CoachResult<InterviewSpec> {
        let result = self.create_inner(session, form).await;
        surface(self.notifier.as_ref(), result)
    }

    async fn create_inner(
        &self,
        session: &SessionContext,
        form: &InterviewForm,
    ) -> CoachResult<InterviewSpec> {
        let user = session.require_user()?;
        let mut state = InterviewState::Draft;

        let form = form.validate()?;
        self.lifecycle.transition(&mut state, InterviewState::Created)?;

        let questions = self.generate(&mut state, &form).await?;

        let spec = self
            .store
            .insert_interview(NewInterview {
                position: form.position,
                description: form.description,
                experience_years: form.experience_years,
                tech_stack: form.tech_stack,
                questions,
                owner_id: user.id.clone(),
            })
            .await?;
        self.lifecycle
            .transition(&mut state, InterviewState::QuestionsReady)?;

        tracing::info!(interview = %spec.id, questions = spec.questions.len(), "Interview created");
        self.notifier.notify(Notification::success(
            "Created..!",
            "New Mock Interview created...",
        ));
        Ok(spec)
    }

    /// Resubmits the whole form for an existing interview and regenerates
    /// its questions. An empty generation leaves the stored interview as is.
    pub async fn edit(
        &self,
        session: &SessionContext,
        interview_id: &str,
        form: &InterviewForm,
    ) -> CoachResult<InterviewSpec> {
        let result = self.edit_inner(session, interview_id, form).await;
        surface(self.notifier.as_ref(), result)
    }

    async fn edit_inner(
        &self,
        session: &SessionContext,
        interview_id: &str,
        form: &InterviewForm,
    ) -> CoachResult<InterviewSpec> {
        let existing = self.owned(session, interview_id).await?;
        let form = form.validate()?;

        self.advance(&existing.id, InterviewState::Edited)?;
        let result = self.regenerate(&existing.id, form).await;
        if result.is_err() {
            self.abandon_edit(&existing.id);
        }
        let spec = result?;

        tracing::info!(interview = %spec.id, "Interview updated");
        self.notifier.notify(Notification::success(
            "Updated..!",
            "Changes saved successfully...",
        ));
        Ok(spec)
    }

    async fn regenerate(&self, interview_id: &str, form: ValidatedForm) -> CoachResult<InterviewSpec> {
        self.advance(interview_id, InterviewState::Created)?;
        self.advance(interview_id, InterviewState::QuestionsPending)?;

        let questions = self.generator.generate(&form).await;
        if questions.is_empty() {
            return Err(no_questions(&form));
        }
        // Fails when the interview was deleted while generation ran.
        self.advance(interview_id, InterviewState::QuestionsReady)?;

        let spec = self
            .store
            .update_interview(
                interview_id,
                InterviewUpdate {
                    position: form.position,
                    description: form.description,
                    experience_years: form.experience_years,
                    tech_stack: form.tech_stack,
                    questions,
                },
            )
            .await?;
        self.states
            .lock()
            .expect("lock not poisoned")
            .remove(interview_id);
        Ok(spec)
    }

    async fn generate(
        &self,
        state: &mut InterviewState,
        form: &ValidatedForm,
    ) -> CoachResult<Vec<Question>> {
        self.lifecycle
            .transition(state, InterviewState::QuestionsPending)?;

        let questions = self.generator.generate(form).await;
        if questions.is_empty() {
            self.lifecycle.transition(state, InterviewState::Draft)?;
            return Err(no_questions(form));
        }
        Ok(questions)
    }

    /// Deletes an interview owned by the current user.
    pub async fn delete(&self, session: &SessionContext, interview_id: &str) -> CoachResult<()> {
        let result = self.delete_inner(session, interview_id).await;
        surface(self.notifier.as_ref(), result)
    }

    async fn delete_inner(&self, session: &SessionContext, interview_id: &str) -> CoachResult<()> {
        let existing = self.owned(session, interview_id).await?;
        self.advance(&existing.id, InterviewState::Deleted)?;

        if let Err(err) = self.store.delete_interview(&existing.id).await {
            self.abandon_delete(&existing.id);
            return Err(err.into());
        }

        tracing::info!(interview = %existing.id, "Interview deleted");
        self.notifier.notify(Notification::info(
            "Deleted!",
            "Interview deleted successfully.",
        ));
        Ok(())
    }

    /// Fetches one interview; absent and foreign interviews are both `NotFound`.
    pub async fn get(&self, session: &SessionContext, interview_id: &str) -> CoachResult<InterviewSpec> {
        let result = self.owned(session, interview_id).await;
        surface(self.notifier.as_ref(), result)
    }

    async fn owned(&self, session: &SessionContext, interview_id: &str) -> CoachResult<InterviewSpec> {
        let user = session.require_user()?;
        self.store
            .get_interview(interview_id)
            .await?
            .filter(|spec| spec.is_owned_by(&user.id))
            .ok_or_else(|| CoachError::NotFound(format!("Interview {}", interview_id)))
    }

    /// The current user's interviews, newest first.
    pub async fn list(&self, session: &SessionContext) -> CoachResult<Vec<InterviewSpec>> {
        let result = match session.require_user() {
            Ok(user) => self.store.list_interviews(&user.id).await.map_err(Into::into),
            Err(e) => Err(e),
        };
        surface(self.notifier.as_ref(), result)
    }

    /// Live view of the current user's interviews. Drop the handle to stop.
    pub async fn subscribe(&self, session: &SessionContext) -> CoachResult<Subscription> {
        let result = match session.require_user() {
            Ok(user) => self
                .store
                .subscribe_interviews(&user.id)
                .await
                .map_err(Into::into),
            Err(e) => Err(e),
        };
        surface(self.notifier.as_ref(), result)
    }

    /// Interviews plus the ids of those with saved answers.
    pub async fn dashboard(&self, session: &SessionContext) -> CoachResult<Dashboard> {
        let result = self.dashboard_inner(session).await;
        surface(self.notifier.as_ref(), result)
    }

    async fn dashboard_inner(&self, session: &SessionContext) -> CoachResult<Dashboard> {
        let user = session.require_user()?;
        let filter = AnswerFilter::new().with_owner(user.id.clone());
        let (interviews, answers) = tokio::join!(
            self.store.list_interviews(&user.id),
            self.store.find_answers(&filter),
        );
        let answered = answers?.into_iter().map(|a| a.interview_id).collect();
        Ok(Dashboard {
            interviews: interviews?,
            answered,
        })
    }

    /// Gate before an interview starts: it must exist and the camera must be on.
    pub async fn prepare_start(
        &self,
        session: &SessionContext,
        interview_id: &str,
        camera: &dyn Camera,
    ) -> CoachResult<InterviewSpec> {
        let result = match self.owned(session, interview_id).await {
            Ok(_) if !camera.is_enabled() => Err(CoachError::validation(
                "Webcam required",
                "Please enable your webcam to start the interview.",
            )),
            other => other,
        };
        surface(self.notifier.as_ref(), result)
    }

    /// Opens an answer session for one question of an owned interview.
    pub async fn answer(
        &self,
        session: &SessionContext,
        interview_id: &str,
        question: &str,
        devices: Devices,
        ctx: AnswerContext,
    ) -> CoachResult<AnswerSession> {
        let result = match self.owned(session, interview_id).await {
            Ok(spec) => AnswerSession::open(&spec, question, devices, ctx),
            Err(e) => Err(e),
        };
        surface(self.notifier.as_ref(), result)
    }
}

fn no_questions(form: &ValidatedForm) -> CoachError {
    CoachError::AiResponseMalformed(format!(
        "no questions generated for '{}'",
        form.position
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::NullCamera;
    use crate::interview::testing::{GatedLlm, ScriptedLlm};
    use crate::interview::types::NewAnswer;
    use crate::notify::{CollectingNotifier, NotificationLevel};
    use crate::session::CurrentUser;
    use crate::storage::MemoryStore;

    const TWO_QUESTIONS: &str = r#"[{"question":"What is the event loop?","answer":""},{"question":"Explain closures","answer":""}]"#;

    struct Harness {
        service: InterviewService,
        store: Arc<MemoryStore>,
        llm: Arc<ScriptedLlm>,
        notifier: Arc<CollectingNotifier>,
        session: SessionContext,
    }

    fn harness(replies: Vec<&str>) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(ScriptedLlm::replying(replies));
        let notifier = Arc::new(CollectingNotifier::new());
        let service = InterviewService::new(
            store.clone(),
            QuestionGenerator::with_defaults(llm.clone()),
            notifier.clone(),
        );
        Harness {
            service,
            store,
            llm,
            notifier,
            session: SessionContext::SignedIn(CurrentUser::new("u1")),
        }
    }

    fn form() -> InterviewForm {
        InterviewForm::new(
            "Frontend Developer",
            "Builds accessible web interfaces",
            "3",
            "JavaScript, React",
        )
    }

    #[tokio::test]
    async fn test_create_persists_generated_questions() {
        let h = harness(vec![TWO_QUESTIONS]);
        let spec = h.service.create(&h.session, &form()).await.unwrap();

        assert_eq!(spec.questions.len(), 2);
        assert_eq!(spec.tech_stack, vec!["JavaScript", "React"]);
        assert_eq!(spec.owner_id, "u1");
        assert!(h.store.get_interview(&spec.id).await.unwrap().is_some());

        let note = h.notifier.last().expect("notified");
        assert_eq!(note.level, NotificationLevel::Success);
        assert_eq!(note.title, "Created..!");
    }

    #[tokio::test]
    async fn test_create_with_no_questions_persists_nothing() {
        let h = harness(vec!["Sorry, I can't do that."]);
        let err = h.service.create(&h.session, &form()).await.unwrap_err();

        assert!(matches!(err, CoachError::AiResponseMalformed(_)));
        assert!(h.store.list_interviews("u1").await.unwrap().is_empty());
        let note = h.notifier.last().expect("notified");
        assert_eq!(note.level, NotificationLevel::Warning);
        assert_eq!(note.title, "Could not generate questions.");
    }

    #[tokio::test]
    async fn test_invalid_form_skips_generation() {
        let h = harness(vec![TWO_QUESTIONS]);
        let mut bad = form();
        bad.description = "short".to_string();
        assert!(matches!(
            h.service.create(&h.session, &bad).await,
            Err(CoachError::Validation { .. })
        ));
        assert_eq!(h.llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_signed_out_is_rejected() {
        let h = harness(vec![TWO_QUESTIONS]);
        let signed_out = SessionContext::SignedOut;
        assert!(matches!(
            h.service.create(&signed_out, &form()).await,
            Err(CoachError::Unauthenticated)
        ));
        assert!(matches!(
            h.service.list(&signed_out).await,
            Err(CoachError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_edit_regenerates_and_empty_result_keeps_record() {
        let h = harness(vec![
            TWO_QUESTIONS,
            r#"[{"question":"What is hydration?","answer":""}]"#,
            "no questions today",
        ]);
        let spec = h.service.create(&h.session, &form()).await.unwrap();

        let mut changed = form();
        changed.position = "Senior Frontend Developer".to_string();
        let edited = h.service.edit(&h.session, &spec.id, &changed).await.unwrap();
        assert_eq!(edited.position, "Senior Frontend Developer");
        assert_eq!(edited.questions.len(), 1);
        assert_eq!(edited.created_at, spec.created_at);
        assert_eq!(h.notifier.last().map(|n| n.title), Some("Updated..!".to_string()));

        let mut again = form();
        again.position = "Staff Frontend Developer".to_string();
        assert!(h.service.edit(&h.session, &spec.id, &again).await.is_err());
        let stored = h.store.get_interview(&spec.id).await.unwrap().unwrap();
        assert_eq!(stored.position, "Senior Frontend Developer");
    }

    #[tokio::test]
    async fn test_foreign_interviews_are_not_found() {
        let h = harness(vec![TWO_QUESTIONS]);
        let spec = h.service.create(&h.session, &form()).await.unwrap();
        let other = SessionContext::SignedIn(CurrentUser::new("u2"));

        assert!(matches!(
            h.service.get(&other, &spec.id).await,
            Err(CoachError::NotFound(_))
        ));
        assert!(matches!(
            h.service.delete(&other, &spec.id).await,
            Err(CoachError::NotFound(_))
        ));
        assert!(matches!(
            h.service.edit(&other, &spec.id, &form()).await,
            Err(CoachError::NotFound(_))
        ));
        assert!(h.service.get(&h.session, &spec.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_notifies_and_updates_subscription() {
        let h = harness(vec![TWO_QUESTIONS]);
        let spec = h.service.create(&h.session, &form()).await.unwrap();

        let mut sub = h.service.subscribe(&h.session).await.unwrap();
        assert_eq!(sub.next().await.map(|s| s.len()), Some(1));

        h.service.delete(&h.session, &spec.id).await.unwrap();
        assert_eq!(sub.next().await.map(|s| s.len()), Some(0));
        assert_eq!(h.notifier.last().map(|n| n.title), Some("Deleted!".to_string()));

        drop(sub);
        assert_eq!(h.store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_dashboard_marks_answered_interviews() {
        let h = harness(vec![TWO_QUESTIONS, TWO_QUESTIONS]);
        let answered = h.service.create(&h.session, &form()).await.unwrap();
        let fresh = h.service.create(&h.session, &form()).await.unwrap();
        h.store
            .insert_answer(NewAnswer {
                interview_id: answered.id.clone(),
                question: "What is the event loop?".to_string(),
                expected_answer: "E".to_string(),
                submitted_answer: "S".to_string(),
                feedback_text: "F".to_string(),
                rating: 8,
                owner_id: "u1".to_string(),
            })
            .await
            .unwrap();

        let dashboard = h.service.dashboard(&h.session).await.unwrap();
        assert_eq!(dashboard.interviews.len(), 2);
        assert!(dashboard.has_answers(&answered.id));
        assert!(!dashboard.has_answers(&fresh.id));
    }

    #[tokio::test]
    async fn test_prepare_start_requires_camera() {
        let h = harness(vec![TWO_QUESTIONS]);
        let spec = h.service.create(&h.session, &form()).await.unwrap();

        let err = h
            .service
            .prepare_start(&h.session, &spec.id, &NullCamera::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Please enable your webcam"));

        let ready = h
            .service
            .prepare_start(&h.session, &spec.id, &NullCamera::enabled())
            .await
            .unwrap();
        assert_eq!(ready.id, spec.id);

        assert!(matches!(
            h.service
                .prepare_start(&h.session, "missing", &NullCamera::enabled())
                .await,
            Err(CoachError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_edit_in_flight_blocks_edits_and_loses_to_delete() {
        let store = Arc::new(MemoryStore::new());
        let session = SessionContext::SignedIn(CurrentUser::new("u1"));
        let setup = InterviewService::new(
            store.clone(),
            QuestionGenerator::with_defaults(Arc::new(ScriptedLlm::replying([TWO_QUESTIONS]))),
            Arc::new(CollectingNotifier::new()),
        );
        let spec = setup.create(&session, &form()).await.unwrap();

        let llm = Arc::new(GatedLlm::replying(TWO_QUESTIONS));
        let service = Arc::new(InterviewService::new(
            store.clone(),
            QuestionGenerator::with_defaults(llm.clone()),
            Arc::new(CollectingNotifier::new()),
        ));

        let pending = {
            let (service, session, id) = (service.clone(), session.clone(), spec.id.clone());
            tokio::spawn(async move {
                let mut changed = form();
                changed.position = "Senior Frontend Developer".to_string();
                service.edit(&session, &id, &changed).await
            })
        };
        llm.wait_started().await;
        assert_eq!(service.state_of(&spec.id), InterviewState::QuestionsPending);

        assert!(matches!(
            service.edit(&session, &spec.id, &form()).await,
            Err(CoachError::InvalidTransition { .. })
        ));

        service.delete(&session, &spec.id).await.unwrap();
        assert_eq!(service.state_of(&spec.id), InterviewState::Deleted);

        llm.release();
        assert!(matches!(
            pending.await.unwrap(),
            Err(CoachError::InvalidTransition { .. })
        ));
        assert!(store.get_interview(&spec.id).await.unwrap().is_none());
        assert_eq!(service.state_of(&spec.id), InterviewState::Deleted);
    }

    #[tokio::test]
    async fn test_failed_edit_settles_back_to_ready() {
        let h = harness(vec![TWO_QUESTIONS, "nothing useful"]);
        let spec = h.service.create(&h.session, &form()).await.unwrap();

        assert!(h.service.edit(&h.session, &spec.id, &form()).await.is_err());
        assert_eq!(h.service.state_of(&spec.id), InterviewState::QuestionsReady);
    }
}

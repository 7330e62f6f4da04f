//! Lifecycle state machines for interviews and per-question answers.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::CoachError;

/// Where an interview is in its create / edit / delete lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewState {
    /// Form being filled in, nothing submitted.
    Draft,
    /// Form submitted and validated.
    Created,
    /// Waiting on question generation.
    QuestionsPending,
    /// Questions generated and persisted.
    QuestionsReady,
    /// Edit submitted; questions will be regenerated.
    Edited,
    /// Removed by its owner. Terminal.
    Deleted,
}

/// Where a single question's answer is in its record / score / save cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerState {
    Unanswered,
    Recording,
    Scored,
    Saved,
}

/// Table-driven transition checker.
///
/// Holds, for each state, the list of states it may move to, and refuses
/// anything not in the table.
#[derive(Debug, Clone)]
pub struct Lifecycle<S> {
    valid_transitions: HashMap<S, Vec<S>>,
}

impl<S> Lifecycle<S>
where
    S: Copy + Eq + Hash + Debug,
{
    fn from_table(table: Vec<(S, Vec<S>)>) -> Self {
        Self {
            valid_transitions: table.into_iter().collect(),
        }
    }

    /// Check if a transition between two states is allowed.
    pub fn can_transition(&self, from: S, to: S) -> bool {
        self.valid_transitions
            .get(&from)
            .map(|targets| targets.contains(&to))
            .unwrap_or(false)
    }

    /// Moves `state` to `to`, or fails without touching it.
    pub fn transition(&self, state: &mut S, to: S) -> Result<(), CoachError> {
        let from = *state;
        if !self.can_transition(from, to) {
            return Err(CoachError::InvalidTransition {
                from: format!("{:?}", from),
                to: format!("{:?}", to),
            });
        }
        tracing::trace!(from = ?from, to = ?to, "State transition");
        *state = to;
        Ok(())
    }

    /// Whether no transition leaves `state`.
    pub fn is_terminal(&self, state: S) -> bool {
        self.valid_transitions
            .get(&state)
            .map(|targets| targets.is_empty())
            .unwrap_or(true)
    }
}

/// Interview transitions.
///
/// - Draft -> Created (form submitted)
/// - Created -> QuestionsPending (generation requested)
/// - QuestionsPending -> QuestionsReady (questions persisted)
/// - QuestionsPending -> Draft (generation produced nothing)
/// - QuestionsReady -> Edited -> Created (edit resubmits the whole form)
/// - any state but Deleted -> Deleted
pub fn interview_lifecycle() -> Lifecycle<InterviewState> {
    use InterviewState::*;
    Lifecycle::from_table(vec![
        (Draft, vec![Created, Deleted]),
        (Created, vec![QuestionsPending, Edited, Deleted]),
        (QuestionsPending, vec![QuestionsReady, Draft, Deleted]),
        (QuestionsReady, vec![Edited, Deleted]),
        (Edited, vec![Created, Deleted]),
        (Deleted, vec![]),
    ])
}

/// Answer transitions.
///
/// Going back to `Unanswered` only happens through the explicit reset path
/// (or a rejected recording); nothing moves backwards on its own.
pub fn answer_lifecycle() -> Lifecycle<AnswerState> {
    use AnswerState::*;
    Lifecycle::from_table(vec![
        (Unanswered, vec![Recording]),
        (Recording, vec![Scored, Unanswered]),
        (Scored, vec![Saved, Unanswered]),
        (Saved, vec![]),
    ])
}

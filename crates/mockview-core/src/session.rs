//! Per-session interview state.
//!
//! A `SessionState` is owned by exactly one controller. The mutators here are
//! the only way to change it, so the used-set invariants hold by construction:
//! a question or context is recorded as used in the same call that makes it
//! current.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Exchange, Turn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    current_question: Option<String>,
    current_context: Option<String>,
    used_contexts: HashSet<String>,
    used_questions: HashSet<String>,
    transcript: Vec<Turn>,
    awaiting_continue_decision: bool,
    pending_answer: Option<String>,
    exchanges: Vec<Exchange>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_question(&self) -> Option<&str> {
        self.current_question.as_deref()
    }

    /// The context bound to the current question, which is also the most
    /// recently used context.
    pub fn current_context(&self) -> Option<&str> {
        self.current_context.as_deref()
    }

    pub fn used_contexts(&self) -> &HashSet<String> {
        &self.used_contexts
    }

    pub fn used_questions(&self) -> &HashSet<String> {
        &self.used_questions
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn awaiting_continue_decision(&self) -> bool {
        self.awaiting_continue_decision
    }

    /// The latest answer that has not received feedback yet.
    pub fn pending_answer(&self) -> Option<&str> {
        self.pending_answer.as_deref()
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn has_asked(&self, question: &str) -> bool {
        self.used_questions.contains(question)
    }

    /// Make `question` current, grounded in `context`, and show it.
    pub(crate) fn commit_question(&mut self, question: String, context: String) {
        self.used_contexts.insert(context.clone());
        self.used_questions.insert(question.clone());
        self.transcript.push(Turn::assistant(question.clone()));
        self.current_context = Some(context);
        self.current_question = Some(question);
        self.pending_answer = None;
        self.awaiting_continue_decision = false;
    }

    pub(crate) fn record_answer(&mut self, answer: &str) {
        self.transcript.push(Turn::user(answer));
        self.pending_answer = Some(answer.to_string());
    }

    /// Append `feedback` unless a turn with identical text is already in the
    /// transcript. Returns whether it was appended.
    pub(crate) fn record_feedback(&mut self, feedback: &str) -> bool {
        let duplicate = self.transcript.iter().any(|turn| turn.content == feedback);
        if !duplicate {
            self.transcript.push(Turn::assistant(feedback));
        }
        if let (Some(question), Some(context), Some(answer)) = (
            self.current_question.as_ref(),
            self.current_context.as_ref(),
            self.pending_answer.take(),
        ) {
            self.exchanges.push(Exchange {
                question: question.clone(),
                context: context.clone(),
                answer,
                feedback: feedback.to_string(),
            });
        }
        self.awaiting_continue_decision = true;
        !duplicate
    }

    /// Drop everything; the state is indistinguishable from a fresh one.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    #[test]
    fn commit_records_question_and_context_as_used() {
        let mut state = SessionState::new();
        state.commit_question("What is a GIL?".into(), "P1".into());

        assert_eq!(state.current_question(), Some("What is a GIL?"));
        assert_eq!(state.current_context(), Some("P1"));
        assert!(state.used_questions().contains("What is a GIL?"));
        assert!(state.used_contexts().contains("P1"));
        assert_eq!(state.transcript().len(), 1);
        assert_eq!(state.transcript()[0].role, Role::Assistant);
        assert!(!state.awaiting_continue_decision());
    }

    #[test]
    fn feedback_is_appended_once_for_identical_text() {
        let mut state = SessionState::new();
        state.commit_question("Q".into(), "C".into());
        state.record_answer("A");
        assert!(state.record_feedback("Good answer."));
        state.record_answer("A");
        assert!(!state.record_feedback("Good answer."));

        let feedback_turns = state
            .transcript()
            .iter()
            .filter(|t| t.content == "Good answer.")
            .count();
        assert_eq!(feedback_turns, 1);
        assert_eq!(state.transcript().len(), 4);
        assert!(state.awaiting_continue_decision());
    }

    #[test]
    fn feedback_completes_an_exchange() {
        let mut state = SessionState::new();
        state.commit_question("Q".into(), "C".into());
        state.record_answer("A");
        assert_eq!(state.pending_answer(), Some("A"));
        state.record_feedback("F");

        assert_eq!(state.pending_answer(), None);
        assert_eq!(
            state.exchanges(),
            &[Exchange {
                question: "Q".into(),
                context: "C".into(),
                answer: "A".into(),
                feedback: "F".into(),
            }]
        );
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = SessionState::new();
        state.commit_question("Q".into(), "C".into());
        state.record_answer("A");
        state.record_feedback("F");
        state.reset();

        assert!(state.is_empty());
        assert!(state.transcript().is_empty());
        assert!(state.used_questions().is_empty());
        assert!(state.used_contexts().is_empty());
        assert_eq!(state.current_question(), None);
        assert_eq!(state.current_context(), None);
    }
}

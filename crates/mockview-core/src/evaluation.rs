//! Answer evaluation.
//!
//! One invocation is one step: record the answer, ask the generator for
//! feedback on `(question, context, answer)`, and show the feedback at most
//! once. Each invocation gets its own thread id for tracing, while the
//! question and context always come from the session.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::controller::{Action, Phase};
use crate::error::InterviewError;
use crate::prompts::{PromptSet, TemplateId};
use crate::question::GenerationSettings;
use crate::session::SessionState;
use crate::traits::Generator;

/// Result of one evaluation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Execution identity of this invocation.
    pub thread_id: Uuid,
    pub feedback: String,
    /// `false` when identical feedback was already in the transcript and the
    /// append was suppressed.
    pub displayed: bool,
}

#[derive(Clone)]
pub struct EvaluationEngine {
    generator: Arc<dyn Generator>,
    prompts: Arc<PromptSet>,
    settings: GenerationSettings,
}

impl EvaluationEngine {
    pub fn new(
        generator: Arc<dyn Generator>,
        prompts: Arc<PromptSet>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            generator,
            prompts,
            settings,
        }
    }

    /// Record `answer` as a user turn and produce feedback for it.
    ///
    /// If the generator fails the answer stays in the transcript and
    /// [`EvaluationEngine::retry`] can finish the step.
    pub async fn evaluate(
        &self,
        session: &mut SessionState,
        answer: &str,
    ) -> Result<Evaluation, InterviewError> {
        require_question(session, Action::SubmitAnswer)?;
        session.record_answer(answer);
        self.feedback(session, answer.to_string()).await
    }

    /// Re-run evaluation for the pending answer without appending it again.
    pub async fn retry(&self, session: &mut SessionState) -> Result<Evaluation, InterviewError> {
        require_question(session, Action::RetryEvaluation)?;
        let Some(answer) = session.pending_answer().map(str::to_string) else {
            return Err(InterviewError::InvalidTransition {
                action: Action::RetryEvaluation,
                phase: Phase::QuestionPendingAnswer,
            });
        };
        self.feedback(session, answer).await
    }

    #[instrument(skip_all, fields(thread_id = tracing::field::Empty))]
    async fn feedback(
        &self,
        session: &mut SessionState,
        answer: String,
    ) -> Result<Evaluation, InterviewError> {
        let thread_id = Uuid::new_v4();
        tracing::Span::current().record("thread_id", tracing::field::display(thread_id));

        let mut variables = BTreeMap::new();
        variables.insert(
            "question".to_string(),
            session.current_question().unwrap_or_default().to_string(),
        );
        variables.insert(
            "context".to_string(),
            session.current_context().unwrap_or_default().to_string(),
        );
        variables.insert("answer".to_string(), answer);

        let request = self
            .settings
            .request(&self.prompts, TemplateId::Evaluation, variables)?;
        let feedback = self.settings.invoke(self.generator.as_ref(), &request).await?;

        let displayed = session.record_feedback(&feedback);
        if !displayed {
            tracing::info!("identical feedback already shown, not appending it again");
        }

        Ok(Evaluation {
            thread_id,
            feedback,
            displayed,
        })
    }
}

fn require_question(session: &SessionState, action: Action) -> Result<(), InterviewError> {
    if session.current_question().is_none() || session.current_context().is_none() {
        return Err(InterviewError::InvalidTransition {
            action,
            phase: Phase::NotStarted,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::traits::{GenerateRequest, GenerateResponse, TokenUsage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    struct Reviewer {
        fail: AtomicBool,
        calls: AtomicU32,
        last: Mutex<Option<GenerateRequest>>,
    }

    impl Reviewer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fail: AtomicBool::new(false),
                calls: AtomicU32::new(0),
                last: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Generator for Reviewer {
        fn name(&self) -> &str {
            "reviewer"
        }

        async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            *self.last.lock().unwrap() = Some(request.clone());
            if self.fail.load(Ordering::Relaxed) {
                anyhow::bail!("service unavailable");
            }
            Ok(GenerateResponse {
                content: format!("Feedback on: {}", request.variables["answer"]),
                model: request.model.clone(),
                token_usage: TokenUsage::default(),
                latency_ms: 0,
            })
        }
    }

    fn engine(generator: Arc<Reviewer>) -> EvaluationEngine {
        EvaluationEngine::new(
            generator,
            Arc::new(PromptSet::default()),
            GenerationSettings::default(),
        )
    }

    fn asked() -> SessionState {
        let mut session = SessionState::new();
        session.commit_question("What is a tuple?".into(), "Tuples are immutable.".into());
        session
    }

    #[tokio::test]
    async fn binds_question_context_and_answer() {
        let reviewer = Reviewer::new();
        let engine = engine(reviewer.clone());
        let mut session = asked();

        let evaluation = engine.evaluate(&mut session, "An immutable list").await.unwrap();

        assert_eq!(evaluation.feedback, "Feedback on: An immutable list");
        assert!(evaluation.displayed);
        assert!(session.awaiting_continue_decision());

        let request = reviewer.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.template, TemplateId::Evaluation);
        assert_eq!(request.variables["question"], "What is a tuple?");
        assert_eq!(request.variables["context"], "Tuples are immutable.");
        assert!(request.prompt.contains("An immutable list"));

        let roles: Vec<Role> = session.transcript().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn identical_feedback_is_displayed_once() {
        let engine = engine(Reviewer::new());
        let mut session = asked();

        let first = engine.evaluate(&mut session, "same").await.unwrap();
        let second = engine.evaluate(&mut session, "same").await.unwrap();

        assert!(first.displayed);
        assert!(!second.displayed);
        assert_ne!(first.thread_id, second.thread_id);
        let shown = session
            .transcript()
            .iter()
            .filter(|t| t.content == "Feedback on: same")
            .count();
        assert_eq!(shown, 1);
    }

    #[tokio::test]
    async fn distinct_feedback_is_always_appended() {
        let engine = engine(Reviewer::new());
        let mut session = asked();

        engine.evaluate(&mut session, "one").await.unwrap();
        let second = engine.evaluate(&mut session, "two").await.unwrap();

        assert!(second.displayed);
        assert_eq!(session.transcript().len(), 5);
    }

    struct Stalled;

    #[async_trait]
    impl Generator for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn generate(&self, _request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            anyhow::bail!("unreachable")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_generator_times_out_and_keeps_answer() {
        let engine = EvaluationEngine::new(
            Arc::new(Stalled),
            Arc::new(PromptSet::default()),
            GenerationSettings {
                timeout: std::time::Duration::from_secs(5),
                ..GenerationSettings::default()
            },
        );
        let mut session = asked();

        let err = engine.evaluate(&mut session, "late answer").await.unwrap_err();

        assert!(
            matches!(&err, InterviewError::Generation(msg) if msg.contains("stalled timed out after 5s")),
            "{err}"
        );
        assert_eq!(session.transcript().len(), 2);
        assert!(!session.awaiting_continue_decision());
        assert_eq!(session.pending_answer(), Some("late answer"));
        assert!(session.exchanges().is_empty());
    }

    #[tokio::test]
    async fn failure_keeps_answer_and_retry_completes() {
        let reviewer = Reviewer::new();
        reviewer.fail.store(true, Ordering::Relaxed);
        let engine = engine(reviewer.clone());
        let mut session = asked();

        let err = engine.evaluate(&mut session, "my answer").await.unwrap_err();
        assert!(matches!(err, InterviewError::Generation(_)));
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript()[1].role, Role::User);
        assert!(!session.awaiting_continue_decision());
        assert_eq!(session.pending_answer(), Some("my answer"));

        reviewer.fail.store(false, Ordering::Relaxed);
        let evaluation = engine.retry(&mut session).await.unwrap();

        assert_eq!(evaluation.feedback, "Feedback on: my answer");
        assert_eq!(session.transcript().len(), 3);
        assert_eq!(reviewer.calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn evaluation_requires_a_question() {
        let engine = engine(Reviewer::new());
        let mut session = SessionState::new();

        let err = engine.evaluate(&mut session, "early").await.unwrap_err();
        assert!(matches!(err, InterviewError::InvalidTransition { .. }));
        assert!(session.is_empty());
    }
}

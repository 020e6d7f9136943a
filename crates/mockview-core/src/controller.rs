//! Interview turn controller.
//!
//! Sequences question generation and answer evaluation for one session and
//! talks to persistence at the session boundaries. Every action either
//! completes or fails before the next one can run, because each takes
//! `&mut self`.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::InterviewError;
use crate::evaluation::{Evaluation, EvaluationEngine};
use crate::model::{SessionId, StoredTurn, UserId};
use crate::prompts::PromptSet;
use crate::question::{GeneratedQuestion, GenerationSettings, QuestionGenerator, DEFAULT_MAX_ATTEMPTS};
use crate::selector::ContextSelector;
use crate::session::SessionState;
use crate::traits::{Authenticator, Generator, Persistence, Retriever};

/// Where a session is in the interview protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    QuestionPendingAnswer,
    FeedbackReady,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::NotStarted => write!(f, "the interview has not started"),
            Phase::QuestionPendingAnswer => write!(f, "a question is awaiting an answer"),
            Phase::FeedbackReady => write!(f, "feedback is ready"),
        }
    }
}

/// A user-facing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Start,
    SubmitAnswer,
    RetryEvaluation,
    Continue,
    Stop,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start => write!(f, "start the interview"),
            Action::SubmitAnswer => write!(f, "submit an answer"),
            Action::RetryEvaluation => write!(f, "retry the evaluation"),
            Action::Continue => write!(f, "continue"),
            Action::Stop => write!(f, "stop"),
        }
    }
}

/// Configuration for an interview session.
#[derive(Debug, Clone)]
pub struct InterviewConfig {
    /// Query sent to the retriever for every question.
    pub topic_query: String,
    /// Passages requested per retrieval.
    pub top_k: usize,
    /// Generation attempts per question before a repeat is accepted.
    pub max_attempts: u32,
    /// Generator settings shared by question and evaluation calls.
    pub generation: GenerationSettings,
    /// Seed for context selection. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            topic_query: "junior developer technical interview".to_string(),
            top_k: 3,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            generation: GenerationSettings::default(),
            seed: None,
        }
    }
}

/// Returned by a successful stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub turns: usize,
    pub questions: usize,
    pub exchanges: usize,
}

/// Drives one interview session.
pub struct TurnController {
    questions: QuestionGenerator,
    evaluator: EvaluationEngine,
    store: Arc<dyn Persistence>,
    auth: Arc<dyn Authenticator>,
    state: SessionState,
    phase: Phase,
    user_id: Option<UserId>,
    session_id: Option<SessionId>,
    persisted_turns: usize,
    persisted_exchanges: usize,
    rng: StdRng,
}

impl TurnController {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        store: Arc<dyn Persistence>,
        auth: Arc<dyn Authenticator>,
        prompts: PromptSet,
        config: InterviewConfig,
    ) -> Self {
        let prompts = Arc::new(prompts);
        let selector = ContextSelector::new(retriever, config.topic_query)
            .with_top_k(config.top_k)
            .with_timeout(config.generation.timeout);
        let questions = QuestionGenerator::new(
            selector,
            Arc::clone(&generator),
            Arc::clone(&prompts),
            config.generation.clone(),
        )
        .with_max_attempts(config.max_attempts);
        let evaluator = EvaluationEngine::new(generator, prompts, config.generation);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            questions,
            evaluator,
            store,
            auth,
            state: SessionState::new(),
            phase: Phase::NotStarted,
            user_id: None,
            session_id: None,
            persisted_turns: 0,
            persisted_exchanges: 0,
            rng,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Begin an interview for the signed-in user and ask the first question.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<GeneratedQuestion, InterviewError> {
        self.expect_phase(Action::Start, Phase::NotStarted)?;
        let user_id = self
            .auth
            .current_user()
            .ok_or(InterviewError::Unauthenticated)?;

        // A start whose first question failed left its stored session behind;
        // reuse it rather than opening another.
        if self.session_id.is_none() || self.user_id != Some(user_id) {
            let session_id = self
                .store
                .create_session(user_id)
                .await
                .map_err(InterviewError::persistence)?;
            tracing::info!(user_id, session_id, "interview session opened");
            self.user_id = Some(user_id);
            self.session_id = Some(session_id);
        }

        let question = self.questions.generate(&mut self.state, &mut self.rng).await?;
        self.phase = Phase::QuestionPendingAnswer;
        Ok(question)
    }

    /// Evaluate the user's answer to the current question.
    #[instrument(skip(self, answer), fields(answer_len = answer.len()))]
    pub async fn submit_answer(&mut self, answer: &str) -> Result<Evaluation, InterviewError> {
        self.expect_phase(Action::SubmitAnswer, Phase::QuestionPendingAnswer)?;
        let evaluation = self.evaluator.evaluate(&mut self.state, answer).await?;
        self.phase = Phase::FeedbackReady;
        Ok(evaluation)
    }

    /// Finish an evaluation whose generator call failed, reusing the
    /// answer already in the transcript.
    #[instrument(skip(self))]
    pub async fn retry_evaluation(&mut self) -> Result<Evaluation, InterviewError> {
        self.expect_phase(Action::RetryEvaluation, Phase::QuestionPendingAnswer)?;
        let evaluation = self.evaluator.retry(&mut self.state).await?;
        self.phase = Phase::FeedbackReady;
        Ok(evaluation)
    }

    /// Ask the next question. Novelty is checked against the whole session.
    #[instrument(skip(self))]
    pub async fn continue_interview(&mut self) -> Result<GeneratedQuestion, InterviewError> {
        self.expect_phase(Action::Continue, Phase::FeedbackReady)?;
        let question = self.questions.generate(&mut self.state, &mut self.rng).await?;
        self.phase = Phase::QuestionPendingAnswer;
        Ok(question)
    }

    /// Persist the transcript and reset the session.
    ///
    /// If persistence fails the in-memory session is kept and `stop` can be
    /// called again; turns written by the failed attempt are not rewritten.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<SessionSummary, InterviewError> {
        self.expect_phase(Action::Stop, Phase::FeedbackReady)?;
        let (Some(user_id), Some(session_id)) = (self.user_id, self.session_id) else {
            return Err(InterviewError::Persistence(
                "session was never opened in the store".to_string(),
            ));
        };

        for turn in &self.state.transcript()[self.persisted_turns..] {
            self.store
                .append_turn(session_id, turn.role, &turn.content, turn.timestamp)
                .await
                .map_err(InterviewError::persistence)?;
            self.persisted_turns += 1;
        }
        for exchange in &self.state.exchanges()[self.persisted_exchanges..] {
            self.store
                .save_exchange(user_id, session_id, exchange)
                .await
                .map_err(InterviewError::persistence)?;
            self.persisted_exchanges += 1;
        }

        let summary = SessionSummary {
            session_id,
            user_id,
            turns: self.state.transcript().len(),
            questions: self.state.used_questions().len(),
            exchanges: self.state.exchanges().len(),
        };
        tracing::info!(session_id, turns = summary.turns, "interview session saved");

        self.state.reset();
        self.phase = Phase::NotStarted;
        self.user_id = None;
        self.session_id = None;
        self.persisted_turns = 0;
        self.persisted_exchanges = 0;
        Ok(summary)
    }

    /// Read back a stored session transcript.
    pub async fn saved_history(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<StoredTurn>, InterviewError> {
        self.store
            .load_history(session_id)
            .await
            .map_err(InterviewError::persistence)
    }

    fn expect_phase(&self, action: Action, required: Phase) -> Result<(), InterviewError> {
        if self.phase == required {
            Ok(())
        } else {
            tracing::debug!(%action, phase = %self.phase, "rejected out-of-turn action");
            Err(InterviewError::InvalidTransition {
                action,
                phase: self.phase,
            })
        }
    }
}

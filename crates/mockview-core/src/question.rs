//! Novel interview question generation.
//!
//! Each attempt selects a context and asks the generator for a question
//! grounded in it. A candidate already asked in this session triggers another
//! attempt; once the attempt budget is spent the last candidate is accepted
//! even if it repeats.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::instrument;

use crate::error::InterviewError;
use crate::prompts::{PromptSet, TemplateId};
use crate::selector::ContextSelector;
use crate::session::SessionState;
use crate::traits::{GenerateRequest, Generator};

/// Default number of generation attempts per question.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Settings shared by every generator call in a session.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout: Duration::from_secs(60),
        }
    }
}

impl GenerationSettings {
    pub(crate) fn request(
        &self,
        prompts: &PromptSet,
        template: TemplateId,
        variables: BTreeMap<String, String>,
    ) -> Result<GenerateRequest, InterviewError> {
        let prompt = prompts
            .render(template, &variables)
            .map_err(InterviewError::generation)?;
        Ok(GenerateRequest {
            model: self.model.clone(),
            template,
            variables,
            prompt,
            system_prompt: Some(prompts.system.clone()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        })
    }

    /// Run one generator call under the configured timeout.
    pub(crate) async fn invoke(
        &self,
        generator: &dyn Generator,
        request: &GenerateRequest,
    ) -> Result<String, InterviewError> {
        let response = tokio::time::timeout(self.timeout, generator.generate(request))
            .await
            .map_err(|_| {
                InterviewError::Generation(format!(
                    "{} timed out after {}s",
                    generator.name(),
                    self.timeout.as_secs()
                ))
            })?
            .map_err(InterviewError::generation)?;
        Ok(response.content.trim().to_string())
    }
}

/// What the question generator committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuestion {
    pub question: String,
    pub context: String,
    /// Generator calls spent, `1..=max_attempts`.
    pub attempts: u32,
    /// The question had already been asked; the attempt budget ran out.
    pub repeated: bool,
    /// The context was reused because the corpus was exhausted.
    pub context_reused: bool,
}

/// Produces questions that have not been asked before in a session.
#[derive(Clone)]
pub struct QuestionGenerator {
    selector: ContextSelector,
    generator: Arc<dyn Generator>,
    prompts: Arc<PromptSet>,
    settings: GenerationSettings,
    max_attempts: u32,
}

impl QuestionGenerator {
    pub fn new(
        selector: ContextSelector,
        generator: Arc<dyn Generator>,
        prompts: Arc<PromptSet>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            selector,
            generator,
            prompts,
            settings,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set the attempt budget. Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Generate a question and commit it to `session`.
    ///
    /// On error the session is left exactly as it was.
    #[instrument(skip_all, fields(generator = self.generator.name(), asked = session.used_questions().len()))]
    pub async fn generate<R: Rng + ?Sized>(
        &self,
        session: &mut SessionState,
        rng: &mut R,
    ) -> Result<GeneratedQuestion, InterviewError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let selection = self
                .selector
                .select(session.used_contexts(), session.current_context(), rng)
                .await?;
            let context_reused = !selection.is_fresh();
            let context = selection.into_text();

            let mut variables = BTreeMap::new();
            variables.insert("context".to_string(), context.clone());
            let request = self
                .settings
                .request(&self.prompts, TemplateId::Question, variables)?;
            let question = self.settings.invoke(self.generator.as_ref(), &request).await?;

            let repeated = session.has_asked(&question);
            if !repeated || attempt >= self.max_attempts {
                if repeated {
                    tracing::warn!(
                        attempts = attempt,
                        "no novel question within the attempt budget, accepting a repeat"
                    );
                }
                session.commit_question(question.clone(), context.clone());
                return Ok(GeneratedQuestion {
                    question,
                    context,
                    attempts: attempt,
                    repeated,
                    context_reused,
                });
            }

            tracing::debug!(attempt, "generator repeated an earlier question");
        }
    }
}

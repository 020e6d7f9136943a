//! Mock collaborators for testing the interview workflow without network
//! access.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use mockview_core::model::Passage;
use mockview_core::prompts::TemplateId;
use mockview_core::traits::{GenerateRequest, GenerateResponse, Generator, Retriever, TokenUsage};

/// A generator that answers question and evaluation prompts from scripts.
///
/// Scripted replies are consumed in order; once a script runs dry the
/// fallback for that template is returned forever.
pub struct MockGenerator {
    questions: Mutex<VecDeque<String>>,
    feedback: Mutex<VecDeque<String>>,
    fallback_question: String,
    /// `None` echoes the answer back as feedback.
    fallback_feedback: Option<String>,
    failures_left: AtomicU32,
    failure_message: Mutex<String>,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockGenerator {
    pub fn scripted<Q, F>(questions: Q, feedback: F) -> Self
    where
        Q: IntoIterator,
        Q::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Self {
            questions: Mutex::new(questions.into_iter().map(Into::into).collect()),
            feedback: Mutex::new(feedback.into_iter().map(Into::into).collect()),
            fallback_question: "Explain list vs tuple".to_string(),
            fallback_feedback: None,
            failures_left: AtomicU32::new(0),
            failure_message: Mutex::new(String::new()),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Every call returns `response`, whatever the template.
    pub fn with_fixed_response(response: &str) -> Self {
        let mut mock = Self::scripted(Vec::<String>::new(), Vec::<String>::new());
        mock.fallback_question = response.to_string();
        mock.fallback_feedback = Some(response.to_string());
        mock
    }

    /// Every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        let mock = Self::scripted(Vec::<String>::new(), Vec::<String>::new());
        mock.fail_next(u32::MAX, message);
        mock
    }

    /// Fail the next `count` calls with `message`, then recover.
    pub fn fail_next(&self, count: u32, message: &str) {
        *lock(&self.failure_message) = message.to_string();
        self.failures_left.store(count, Ordering::Relaxed);
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        lock(&self.last_request).clone()
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| left.checked_sub(1))
            .is_ok()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Generator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *lock(&self.last_request) = Some(request.clone());

        if self.take_failure() {
            anyhow::bail!("{}", lock(&self.failure_message));
        }

        let content = match request.template {
            TemplateId::Question => lock(&self.questions)
                .pop_front()
                .unwrap_or_else(|| self.fallback_question.clone()),
            TemplateId::Evaluation => lock(&self.feedback).pop_front().unwrap_or_else(|| {
                self.fallback_feedback.clone().unwrap_or_else(|| {
                    let answer = request.variables.get("answer").map_or("", String::as_str);
                    format!("Feedback on: {answer}")
                })
            }),
        };

        let prompt_tokens = (request.prompt.len() / 4) as u32; // Rough estimate
        let completion_tokens = (content.len() / 4) as u32;
        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            latency_ms: 1,
        })
    }
}

/// A retriever whose backend is always down.
#[derive(Debug, Clone, Default)]
pub struct UnreachableRetriever;

#[async_trait]
impl Retriever for UnreachableRetriever {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn query(&self, _text: &str, _top_k: usize) -> anyhow::Result<Vec<Passage>> {
        anyhow::bail!("connection refused")
    }
}

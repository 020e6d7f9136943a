//! Picks the passage the next question is grounded in.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::instrument;

use crate::error::InterviewError;
use crate::traits::Retriever;

/// Chooses an unused passage for a fixed topic query.
#[derive(Clone)]
pub struct ContextSelector {
    retriever: Arc<dyn Retriever>,
    query: String,
    top_k: usize,
    timeout: Duration,
}

/// Where a selected context came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A passage not shown before in this session.
    Fresh(String),
    /// Every retrieved passage was already used; the most recent context is
    /// reused.
    Reused(String),
}

impl Selection {
    pub fn text(&self) -> &str {
        match self {
            Selection::Fresh(text) | Selection::Reused(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Selection::Fresh(text) | Selection::Reused(text) => text,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Selection::Fresh(_))
    }
}

impl ContextSelector {
    pub fn new(retriever: Arc<dyn Retriever>, query: impl Into<String>) -> Self {
        Self {
            retriever,
            query: query.into(),
            top_k: 3,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Select a context not in `used`, uniformly at random among the
    /// retrieved candidates. When the candidates are exhausted, `most_recent`
    /// is reused. `used` is never modified here.
    #[instrument(skip_all, fields(retriever = self.retriever.name(), used = used.len()))]
    pub async fn select<R: Rng + ?Sized>(
        &self,
        used: &HashSet<String>,
        most_recent: Option<&str>,
        rng: &mut R,
    ) -> Result<Selection, InterviewError> {
        let passages = tokio::time::timeout(
            self.timeout,
            self.retriever.query(&self.query, self.top_k),
        )
        .await
        .map_err(|_| {
            InterviewError::Retrieval(format!(
                "retriever timed out after {}s",
                self.timeout.as_secs()
            ))
        })?
        .map_err(InterviewError::retrieval)?;

        let mut fresh: Vec<&str> = Vec::new();
        for passage in &passages {
            let text = passage.text.as_str();
            if !used.contains(text) && !fresh.contains(&text) {
                fresh.push(text);
            }
        }

        if let Some(choice) = fresh.choose(rng) {
            tracing::debug!(candidates = fresh.len(), "selected fresh context");
            return Ok(Selection::Fresh(choice.to_string()));
        }

        match most_recent {
            Some(previous) => {
                tracing::info!(
                    retrieved = passages.len(),
                    "corpus exhausted, reusing most recent context"
                );
                Ok(Selection::Reused(previous.to_string()))
            }
            None => Err(InterviewError::EmptyCorpus(self.query.clone())),
        }
    }
}

//! Collaborator trait definitions.
//!
//! The interview workflow only talks to the outside world through these
//! traits. `mockview-providers` implements the retrieval and generation
//! backends, `mockview-store` implements persistence and the sign-in gate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Exchange, Passage, Role, SessionId, StoredTurn, UserId};
use crate::prompts::TemplateId;

// ---------------------------------------------------------------------------
// Retriever trait
// ---------------------------------------------------------------------------

/// A pre-built, queryable passage corpus.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Human-readable backend name (e.g. "pinecone").
    fn name(&self) -> &str;

    /// Return up to `top_k` passages ordered by decreasing relevance.
    ///
    /// An empty corpus yields `Ok(vec![])`, never an error.
    async fn query(&self, text: &str, top_k: usize) -> anyhow::Result<Vec<Passage>>;
}

// ---------------------------------------------------------------------------
// Generator trait
// ---------------------------------------------------------------------------

/// Single-shot text completion backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Complete a bound prompt template.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;
}

/// A prompt template bound to its variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "gpt-4o-mini").
    pub model: String,
    /// Which template the prompt was rendered from.
    pub template: TemplateId,
    /// Variables bound into the template.
    pub variables: BTreeMap<String, String>,
    /// The rendered prompt.
    pub prompt: String,
    /// Optional system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Generated text plus accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The generated text.
    pub content: String,
    /// Model that actually produced the response.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting for one generator call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Persistence trait
// ---------------------------------------------------------------------------

/// Transcript storage consulted at session boundaries.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Open a new stored session for `user_id`.
    async fn create_session(&self, user_id: UserId) -> anyhow::Result<SessionId>;

    /// Append one transcript turn.
    async fn append_turn(
        &self,
        session_id: SessionId,
        sender: Role,
        text: &str,
        timestamp: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// Load a session transcript in chronological order.
    async fn load_history(&self, session_id: SessionId) -> anyhow::Result<Vec<StoredTurn>>;

    /// Store a completed question/answer/feedback record.
    async fn save_exchange(
        &self,
        user_id: UserId,
        session_id: SessionId,
        exchange: &Exchange,
    ) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Authentication gate
// ---------------------------------------------------------------------------

/// Reports who, if anyone, is signed in.
pub trait Authenticator: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// An authenticator with a fixed answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedUser(pub Option<UserId>);

impl Authenticator for FixedUser {
    fn current_user(&self) -> Option<UserId> {
        self.0
    }
}

//! Interview workflow error types.
//!
//! Collaborators report failures as `anyhow::Error`; the workflow maps them
//! onto this taxonomy so callers can decide what is retryable.

use thiserror::Error;

use crate::controller::{Action, Phase};

/// Errors produced by the interview workflow.
#[derive(Debug, Error)]
pub enum InterviewError {
    /// The retriever could not be reached or timed out.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// The generator call failed, timed out, or hit a quota.
    #[error("generation failed: {0}")]
    Generation(String),

    /// An action was attempted outside the phase where it is legal.
    #[error("cannot {action} while {phase}")]
    InvalidTransition { action: Action, phase: Phase },

    /// A persistence collaborator read or write failed.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// The retriever returned no passages and no context was ever used.
    #[error("corpus returned no passages for query '{0}'")]
    EmptyCorpus(String),

    /// No user is signed in.
    #[error("no user is signed in")]
    Unauthenticated,
}

impl InterviewError {
    /// Returns `true` for rejected actions, which leave the session unchanged.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            InterviewError::InvalidTransition { .. } | InterviewError::Unauthenticated
        )
    }

    pub(crate) fn retrieval(err: anyhow::Error) -> Self {
        InterviewError::Retrieval(format!("{err:#}"))
    }

    pub(crate) fn generation(err: anyhow::Error) -> Self {
        InterviewError::Generation(format!("{err:#}"))
    }

    pub(crate) fn persistence(err: anyhow::Error) -> Self {
        InterviewError::Persistence(format!("{err:#}"))
    }
}

//! Transcript export with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Role, SessionId, StoredTurn};

/// A stored session transcript written out for sharing or review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptExport {
    pub id: Uuid,
    pub exported_at: DateTime<Utc>,
    pub username: String,
    pub session_id: SessionId,
    pub turns: Vec<StoredTurn>,
}

impl TranscriptExport {
    pub fn new(username: impl Into<String>, session_id: SessionId, turns: Vec<StoredTurn>) -> Self {
        Self {
            id: Uuid::new_v4(),
            exported_at: Utc::now(),
            username: username.into(),
            session_id,
            turns,
        }
    }

    /// Number of questions and feedback messages the interviewer sent.
    pub fn assistant_turns(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.role == Role::Assistant)
            .count()
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize transcript")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write transcript to {}", path.display()))?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read transcript from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse transcript JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: Role, content: &str) -> StoredTurn {
        StoredTurn {
            session_id: 4,
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn save_and_reload_into_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports").join("session-4.json");
        let export = TranscriptExport::new(
            "ada",
            4,
            vec![
                turn(Role::Assistant, "What is a tuple?"),
                turn(Role::User, "An immutable sequence."),
                turn(Role::Assistant, "Correct."),
            ],
        );

        export.save_json(&path).unwrap();
        let loaded = TranscriptExport::load_json(&path).unwrap();

        assert_eq!(loaded, export);
        assert_eq!(loaded.assistant_turns(), 2);
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = TranscriptExport::load_json(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parse"));
    }
}

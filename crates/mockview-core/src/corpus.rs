//! Pre-built passage corpus files.
//!
//! A corpus file is TOML with a `[corpus]` header and one `[[passages]]`
//! table per passage. Corpora are only loaded here, never built.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::Passage;

/// A loaded corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub passages: Vec<Passage>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct TomlCorpusFile {
    corpus: TomlCorpusHeader,
    #[serde(default)]
    passages: Vec<TomlPassage>,
}

#[derive(Debug, Deserialize)]
struct TomlCorpusHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlPassage {
    #[serde(default)]
    id: Option<String>,
    text: String,
}

/// Parse a corpus file.
pub fn parse_corpus(path: &Path) -> Result<Corpus> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus file: {}", path.display()))?;

    parse_corpus_str(&content, path)
}

/// Parse corpus TOML. Passages without an id are numbered by position.
pub fn parse_corpus_str(content: &str, source_path: &Path) -> Result<Corpus> {
    let parsed: TomlCorpusFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let passages = parsed
        .passages
        .into_iter()
        .enumerate()
        .map(|(i, p)| Passage::new(p.id.unwrap_or_else(|| format!("p{}", i + 1)), p.text))
        .collect();

    Ok(Corpus {
        id: parsed.corpus.id,
        name: parsed.corpus.name,
        description: parsed.corpus.description,
        passages,
    })
}

/// A problem found while validating a corpus.
#[derive(Debug, Clone)]
pub struct CorpusWarning {
    pub passage_id: Option<String>,
    pub message: String,
}

/// Check a corpus for problems that would make interviews repetitive or
/// empty. Contexts are compared by text, so duplicate text collapses into a
/// single usable context.
pub fn validate_corpus(corpus: &Corpus) -> Vec<CorpusWarning> {
    let mut warnings = Vec::new();

    if corpus.is_empty() {
        warnings.push(CorpusWarning {
            passage_id: None,
            message: "corpus has no passages".into(),
        });
    }

    let mut seen_ids = HashSet::new();
    let mut seen_text = HashSet::new();
    for passage in &corpus.passages {
        if !seen_ids.insert(passage.id.as_str()) {
            warnings.push(CorpusWarning {
                passage_id: Some(passage.id.clone()),
                message: format!("duplicate passage ID: {}", passage.id),
            });
        }
        if passage.text.trim().is_empty() {
            warnings.push(CorpusWarning {
                passage_id: Some(passage.id.clone()),
                message: "passage text is empty".into(),
            });
        } else if !seen_text.insert(passage.text.as_str()) {
            warnings.push(CorpusWarning {
                passage_id: Some(passage.id.clone()),
                message: "passage text duplicates an earlier passage".into(),
            });
        }
    }

    warnings
}

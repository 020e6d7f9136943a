//! Prompt templates for question generation and answer evaluation.
//!
//! Templates use `{name}` placeholders; `{{` and `}}` produce literal braces.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Identifies which template a generator request was rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateId {
    Question,
    Evaluation,
}

impl TemplateId {
    /// Placeholders every template of this kind must reference.
    pub fn required_variables(self) -> &'static [&'static str] {
        match self {
            TemplateId::Question => &["context"],
            TemplateId::Evaluation => &["question", "answer", "context"],
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateId::Question => write!(f, "question"),
            TemplateId::Evaluation => write!(f, "evaluation"),
        }
    }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a technical interviewer at an IT company \
hiring junior developers. Ask exactly one question at a time, and when the candidate answers, \
give concise, constructive feedback before moving on.";

pub const DEFAULT_QUESTION_TEMPLATE: &str = "Using the reference material below, write one \
technical interview question for a junior developer. Reply with the question only.

Reference:
{context}

Question:";

pub const DEFAULT_EVALUATION_TEMPLATE: &str = "You asked the candidate the following interview \
question, grounded in the reference material.

Reference:
{context}

Question:
{question}

Candidate answer:
{answer}

Evaluate the answer: point out what is correct, what is missing or wrong, and suggest how to \
improve it.";

/// The full set of templates used by an interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSet {
    #[serde(default = "default_system")]
    pub system: String,
    #[serde(default = "default_question")]
    pub question: String,
    #[serde(default = "default_evaluation")]
    pub evaluation: String,
}

fn default_system() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}
fn default_question() -> String {
    DEFAULT_QUESTION_TEMPLATE.to_string()
}
fn default_evaluation() -> String {
    DEFAULT_EVALUATION_TEMPLATE.to_string()
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            system: default_system(),
            question: default_question(),
            evaluation: default_evaluation(),
        }
    }
}

impl PromptSet {
    pub fn template(&self, id: TemplateId) -> &str {
        match id {
            TemplateId::Question => &self.question,
            TemplateId::Evaluation => &self.evaluation,
        }
    }

    /// Render template `id` with `variables`.
    pub fn render(&self, id: TemplateId, variables: &BTreeMap<String, String>) -> Result<String> {
        render_template(self.template(id), variables)
    }

    /// Check that each template parses and references its required variables.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for id in [TemplateId::Question, TemplateId::Evaluation] {
            match placeholders(self.template(id)) {
                Ok(found) => {
                    for required in id.required_variables() {
                        if !found.iter().any(|name| name == required) {
                            problems.push(format!("{id} template never uses {{{required}}}"));
                        }
                    }
                }
                Err(e) => problems.push(format!("{id} template: {e}")),
            }
        }
        problems
    }
}

/// Substitute `{name}` placeholders. Unbound placeholders are an error.
pub fn render_template(template: &str, variables: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    scan(template, |piece| {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Placeholder(name) => match variables.get(name) {
                Some(value) => out.push_str(value),
                None => anyhow::bail!("unbound template variable '{name}'"),
            },
        }
        Ok(())
    })?;
    Ok(out)
}

fn placeholders(template: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    scan(template, |piece| {
        if let Piece::Placeholder(name) = piece {
            names.push(name.to_string());
        }
        Ok(())
    })?;
    Ok(names)
}

enum Piece<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

fn scan<'a>(template: &'a str, mut visit: impl FnMut(Piece<'a>) -> Result<()>) -> Result<()> {
    let mut rest = template;
    while let Some(pos) = rest.find(['{', '}']) {
        visit(Piece::Text(&rest[..pos]))?;
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            visit(Piece::Text("{"))?;
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            visit(Piece::Text("}"))?;
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            anyhow::bail!("unmatched '}}' in template");
        } else {
            let Some(end) = tail.find('}') else {
                anyhow::bail!("unclosed '{{' in template");
            };
            let name = tail[1..end].trim();
            anyhow::ensure!(
                !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_'),
                "invalid placeholder '{}'",
                &tail[..=end]
            );
            visit(Piece::Placeholder(name))?;
            rest = &tail[end + 1..];
        }
    }
    visit(Piece::Text(rest))
}

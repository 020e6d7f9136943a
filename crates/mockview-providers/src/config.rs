//! Configuration loading and backend factories.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mockview_core::controller::InterviewConfig;
use mockview_core::prompts::PromptSet;
use mockview_core::question::{GenerationSettings, DEFAULT_MAX_ATTEMPTS};
use mockview_core::traits::{Generator, Retriever};

use crate::memory::MemoryRetriever;
use crate::ollama::OllamaGenerator;
use crate::openai::OpenAiGenerator;
use crate::pinecone::{PineconeRetriever, PineconeSettings, DEFAULT_API_URL, DEFAULT_EMBED_MODEL};

/// Configuration for a generator backend.
///
/// `Debug` masks API keys.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GeneratorConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratorConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            GeneratorConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    crate::ollama::DEFAULT_BASE_URL.to_string()
}

/// Configuration for the passage retriever.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RetrieverConfig {
    Pinecone {
        api_key: String,
        index_host: String,
        #[serde(default = "default_namespace")]
        namespace: String,
        #[serde(default = "default_embed_model")]
        embed_model: String,
        #[serde(default = "default_pinecone_api")]
        api_url: String,
    },
    Corpus {
        path: PathBuf,
    },
}

impl std::fmt::Debug for RetrieverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrieverConfig::Pinecone {
                api_key: _,
                index_host,
                namespace,
                embed_model,
                api_url,
            } => f
                .debug_struct("Pinecone")
                .field("api_key", &"***")
                .field("index_host", index_host)
                .field("namespace", namespace)
                .field("embed_model", embed_model)
                .field("api_url", api_url)
                .finish(),
            RetrieverConfig::Corpus { path } => {
                f.debug_struct("Corpus").field("path", path).finish()
            }
        }
    }
}

fn default_namespace() -> String {
    "example-namespace".to_string()
}
fn default_embed_model() -> String {
    DEFAULT_EMBED_MODEL.to_string()
}
fn default_pinecone_api() -> String {
    DEFAULT_API_URL.to_string()
}

/// The `[interview]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSettings {
    #[serde(default = "default_topic_query")]
    pub topic_query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Upper bound on each retriever and generator call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Fixed seed for context selection; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_topic_query() -> String {
    InterviewConfig::default().topic_query
}
fn default_top_k() -> usize {
    3
}
fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_request_timeout() -> u64 {
    60
}

impl Default for InterviewSettings {
    fn default() -> Self {
        Self {
            topic_query: default_topic_query(),
            top_k: default_top_k(),
            max_attempts: default_max_attempts(),
            request_timeout_secs: default_request_timeout(),
            seed: None,
        }
    }
}

/// Top-level mockview configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockviewConfig {
    /// Generator backends keyed by name.
    #[serde(default)]
    pub generators: HashMap<String, GeneratorConfig>,
    /// Generator used for interviews.
    #[serde(default = "default_generator")]
    pub default_generator: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// SQLite database file.
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default)]
    pub retriever: Option<RetrieverConfig>,
    #[serde(default)]
    pub interview: InterviewSettings,
    #[serde(default)]
    pub prompts: PromptSet,
}

fn default_generator() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_database() -> PathBuf {
    PathBuf::from("mockview.db")
}

impl Default for MockviewConfig {
    fn default() -> Self {
        Self {
            generators: HashMap::new(),
            default_generator: default_generator(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            database: default_database(),
            retriever: None,
            interview: InterviewSettings::default(),
            prompts: PromptSet::default(),
        }
    }
}

impl MockviewConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.interview.request_timeout_secs)
    }

    /// Settings for a [`mockview_core::controller::TurnController`].
    pub fn interview_config(&self) -> InterviewConfig {
        InterviewConfig {
            topic_query: self.interview.topic_query.clone(),
            top_k: self.interview.top_k,
            max_attempts: self.interview.max_attempts,
            generation: GenerationSettings {
                model: self.default_model.clone(),
                temperature: self.default_temperature,
                max_tokens: self.max_tokens,
                timeout: self.request_timeout(),
            },
            seed: self.interview.seed,
        }
    }

    /// Report settings that would make an interview fail or misbehave.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        match self.generators.get(&self.default_generator) {
            None => problems.push(format!(
                "default generator '{}' is not configured",
                self.default_generator
            )),
            Some(GeneratorConfig::OpenAI { api_key, .. }) if api_key.trim().is_empty() => {
                problems.push(format!(
                    "generator '{}' has an empty api_key",
                    self.default_generator
                ))
            }
            Some(_) => {}
        }

        match &self.retriever {
            None => problems.push("no retriever is configured".into()),
            Some(RetrieverConfig::Pinecone {
                api_key,
                index_host,
                ..
            }) => {
                if api_key.trim().is_empty() {
                    problems.push("pinecone retriever has an empty api_key".into());
                }
                if index_host.trim().is_empty() {
                    problems.push("pinecone retriever has an empty index_host".into());
                }
            }
            Some(RetrieverConfig::Corpus { path }) => {
                if !path.exists() {
                    problems.push(format!("corpus file not found: {}", path.display()));
                }
            }
        }

        if self.interview.top_k == 0 {
            problems.push("interview.top_k must be at least 1".into());
        }
        if self.interview.max_attempts == 0 {
            problems.push("interview.max_attempts must be at least 1".into());
        }
        if self.interview.request_timeout_secs == 0 {
            problems.push("interview.request_timeout_secs must be at least 1".into());
        }
        if !(0.0..=2.0).contains(&self.default_temperature) {
            problems.push(format!(
                "default_temperature {} is outside 0.0..=2.0",
                self.default_temperature
            ));
        }
        problems.extend(self.prompts.validate());

        problems
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

fn resolve_generator_config(config: &GeneratorConfig) -> GeneratorConfig {
    match config {
        GeneratorConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => GeneratorConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_deref().map(resolve_env_vars),
            org_id: org_id.as_deref().map(resolve_env_vars),
        },
        GeneratorConfig::Ollama { base_url } => GeneratorConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
    }
}

fn resolve_retriever_config(config: &RetrieverConfig) -> RetrieverConfig {
    match config {
        RetrieverConfig::Pinecone {
            api_key,
            index_host,
            namespace,
            embed_model,
            api_url,
        } => RetrieverConfig::Pinecone {
            api_key: resolve_env_vars(api_key),
            index_host: resolve_env_vars(index_host),
            namespace: resolve_env_vars(namespace),
            embed_model: embed_model.clone(),
            api_url: resolve_env_vars(api_url),
        },
        RetrieverConfig::Corpus { path } => RetrieverConfig::Corpus {
            path: PathBuf::from(resolve_env_vars(&path.to_string_lossy())),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `mockview.toml` in the current directory
/// 2. `~/.config/mockview/config.toml`
///
/// Environment variable overrides: `MOCKVIEW_OPENAI_KEY`, `MOCKVIEW_PINECONE_KEY`.
pub fn load_config() -> Result<MockviewConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MockviewConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("mockview.toml");
            if local.exists() {
                Some(local)
            } else {
                config_dir()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<MockviewConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => MockviewConfig::default(),
    };

    if let Ok(key) = std::env::var("MOCKVIEW_OPENAI_KEY") {
        let entry = config
            .generators
            .entry("openai".into())
            .or_insert(GeneratorConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let GeneratorConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("MOCKVIEW_PINECONE_KEY") {
        if let Some(RetrieverConfig::Pinecone { api_key, .. }) = config.retriever.as_mut() {
            *api_key = key;
        }
    }

    config.generators = config
        .generators
        .iter()
        .map(|(k, v)| (k.clone(), resolve_generator_config(v)))
        .collect();
    config.retriever = config.retriever.as_ref().map(resolve_retriever_config);

    Ok(config)
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("mockview"))
}

/// Build the configured default generator.
pub fn create_generator(config: &MockviewConfig) -> Result<Arc<dyn Generator>> {
    let name = &config.default_generator;
    let generator_config = config
        .generators
        .get(name)
        .with_context(|| format!("generator '{name}' is not configured"))?;

    let generator: Arc<dyn Generator> = match generator_config {
        GeneratorConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Arc::new(OpenAiGenerator::with_timeout(
            api_key,
            base_url.clone(),
            org_id.clone(),
            config.interview.request_timeout_secs,
        )?),
        GeneratorConfig::Ollama { base_url } => Arc::new(OllamaGenerator::new(base_url)?),
    };
    Ok(generator)
}

/// Build the configured retriever.
pub fn create_retriever(config: &MockviewConfig) -> Result<Arc<dyn Retriever>> {
    let retriever_config = config
        .retriever
        .as_ref()
        .context("no retriever is configured; add a [retriever] section")?;

    let retriever: Arc<dyn Retriever> = match retriever_config {
        RetrieverConfig::Pinecone {
            api_key,
            index_host,
            namespace,
            embed_model,
            api_url,
        } => Arc::new(PineconeRetriever::new(
            api_key,
            PineconeSettings {
                index_host: index_host.clone(),
                namespace: namespace.clone(),
                embed_model: embed_model.clone(),
                api_url: api_url.clone(),
            },
        )?),
        RetrieverConfig::Corpus { path } => Arc::new(MemoryRetriever::from_path(path)?),
    };
    Ok(retriever)
}

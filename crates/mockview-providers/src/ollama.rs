//! Ollama (local model) generator.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mockview_core::prompts::DEFAULT_SYSTEM_PROMPT;
use mockview_core::traits::{GenerateRequest, GenerateResponse, Generator, TokenUsage};

use crate::error::ProviderError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 300; // Local models are slower

pub struct OllamaGenerator {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url.trim_end_matches('/')
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base.to_string(),
            client,
        })
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
    model: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %request.model, template = %request.template))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let body = OllamaRequest {
            model: &request.model,
            messages: vec![
                OllamaMessage {
                    role: "system",
                    content: request
                        .system_prompt
                        .as_deref()
                        .unwrap_or(DEFAULT_SYSTEM_PROMPT),
                },
                OllamaMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::NetworkError(format!(
                        "Ollama not reachable at {}. Is it running? Start with: ollama serve",
                        self.base_url
                    ))
                } else {
                    ProviderError::from_reqwest(e, DEFAULT_TIMEOUT_SECS)
                }
            })?;

        if !response.status().is_success() {
            let what = format!(
                "model '{}' is not available locally, pull it with: ollama pull {}",
                request.model, request.model
            );
            return Err(ProviderError::from_response(response, &what).await.into());
        }

        let api_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let prompt_tokens = api_response.prompt_eval_count.unwrap_or(0);
        let completion_tokens = api_response.eval_count.unwrap_or(0);

        Ok(GenerateResponse {
            content: api_response.message.content,
            model: api_response.model,
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

//! Pinecone vector index retriever.
//!
//! The query is embedded with Pinecone's hosted inference API and the
//! resulting vector is sent to the index host. Passage text is read from the
//! `text` metadata field written at ingestion time.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mockview_core::model::Passage;
use mockview_core::traits::Retriever;

use crate::error::ProviderError;

pub const DEFAULT_API_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_EMBED_MODEL: &str = "multilingual-e5-large";
const API_VERSION: &str = "2024-10";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for a Pinecone index.
#[derive(Debug, Clone)]
pub struct PineconeSettings {
    /// Data-plane host of the index, e.g. `https://example-index-abc123.svc.pinecone.io`.
    pub index_host: String,
    pub namespace: String,
    pub embed_model: String,
    /// Control-plane URL serving `/embed`.
    pub api_url: String,
}

pub struct PineconeRetriever {
    api_key: String,
    settings: PineconeSettings,
    client: reqwest::Client,
}

impl PineconeRetriever {
    pub fn new(api_key: &str, settings: PineconeSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            api_key: api_key.to_string(),
            settings,
            client,
        })
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: String,
        body: &B,
        what: &str,
    ) -> Result<R, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, DEFAULT_TIMEOUT_SECS))?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response, what).await);
        }
        response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = EmbedRequest {
            model: &self.settings.embed_model,
            parameters: EmbedParameters {
                input_type: "query",
                truncate: "END",
            },
            inputs: vec![EmbedInput { text }],
        };
        let what = format!("embedding model '{}'", self.settings.embed_model);
        let response: EmbedResponse = self
            .post(format!("{}/embed", self.settings.api_url), &body, &what)
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|e| e.values)
            .ok_or_else(|| ProviderError::MalformedResponse("no embedding returned".into()))
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    parameters: EmbedParameters,
    inputs: Vec<EmbedInput<'a>>,
}

#[derive(Serialize)]
struct EmbedParameters {
    input_type: &'static str,
    truncate: &'static str,
}

#[derive(Serialize)]
struct EmbedInput<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<Embedding>,
}

#[derive(Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: Vec<f32>,
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<MatchMetadata>,
}

#[derive(Deserialize)]
struct MatchMetadata {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl Retriever for PineconeRetriever {
    fn name(&self) -> &str {
        "pinecone"
    }

    #[instrument(skip(self, text), fields(namespace = %self.settings.namespace))]
    async fn query(&self, text: &str, top_k: usize) -> anyhow::Result<Vec<Passage>> {
        let vector = self.embed_query(text).await?;

        let body = QueryRequest {
            namespace: &self.settings.namespace,
            vector,
            top_k,
            include_values: false,
            include_metadata: true,
        };
        let what = format!("index at {}", self.settings.index_host);
        let response: QueryResponse = self
            .post(format!("{}/query", self.settings.index_host), &body, &what)
            .await?;

        let mut passages = Vec::with_capacity(response.matches.len());
        for m in response.matches {
            match m.metadata.and_then(|md| md.text) {
                Some(text) => passages.push(Passage {
                    id: m.id,
                    text,
                    score: m.score,
                }),
                None => tracing::warn!(id = %m.id, "match has no text metadata, skipping"),
            }
        }
        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn retriever(server: &MockServer) -> PineconeRetriever {
        PineconeRetriever::new(
            "pc-key",
            PineconeSettings {
                index_host: server.uri(),
                namespace: "python-notes".into(),
                embed_model: DEFAULT_EMBED_MODEL.into(),
                api_url: server.uri(),
            },
        )
        .unwrap()
    }

    async fn mount_embed(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/embed"))
            .and(header("Api-Key", "pc-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "multilingual-e5-large",
                "parameters": {"input_type": "query"},
                "inputs": [{"text": "junior python"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "multilingual-e5-large",
                "data": [{"values": [0.1, 0.2, 0.3]}]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn embeds_then_queries_namespace() {
        let server = MockServer::start().await;
        mount_embed(&server).await;

        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_partial_json(serde_json::json!({
                "namespace": "python-notes",
                "topK": 3,
                "includeMetadata": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "matches": [
                    {"id": "vec1", "score": 0.91, "metadata": {"text": "Tuples are immutable."}},
                    {"id": "vec2", "score": 0.80, "metadata": {"source": "no text here"}},
                    {"id": "vec3", "score": 0.75, "metadata": {"text": "Lists are mutable."}}
                ],
                "namespace": "python-notes"
            })))
            .mount(&server)
            .await;

        let passages = retriever(&server).query("junior python", 3).await.unwrap();

        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].id, "vec1");
        assert_eq!(passages[0].text, "Tuples are immutable.");
        assert!(passages[0].score > passages[1].score);
    }

    #[tokio::test]
    async fn empty_index_yields_no_passages() {
        let server = MockServer::start().await;
        mount_embed(&server).await;

        Mock::given(method("POST"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "matches": []
            })))
            .mount(&server)
            .await;

        let passages = retriever(&server).query("junior python", 3).await.unwrap();
        assert!(passages.is_empty());
    }

    #[tokio::test]
    async fn rejected_key_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = retriever(&server)
            .query("junior python", 3)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::AuthenticationFailed(_))
        ));
    }
}

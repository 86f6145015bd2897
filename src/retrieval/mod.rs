//! Retrieval port
//!
//! Narrow interface over the vector-similarity backend: query string and a
//! passage budget in, ranked passages out. An empty result is a valid
//! answer; only an unreachable backend is an error, and callers degrade to
//! an empty context rather than failing the turn.

use crate::errors::{AdvisorError, Result};
use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        value::Kind, with_payload_selector::SelectorOptions, SearchPoints, Value as QdrantValue,
        WithPayloadSelector,
    },
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A retrieved text unit with relevance score and source locator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub score: f32,
    /// Source locator, e.g. "catalog p.42"
    pub source: String,
}

/// Retrieval port: query + passage budget in, ranked passages out
#[async_trait]
pub trait RetrievalPort: Send + Sync {
    /// Search for up to `k` passages relevant to `query`
    ///
    /// Fails only with `RetrievalUnavailable`; an empty vector is a valid
    /// non-error result.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Query embedder backed by the generation backend's embeddings endpoint
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    /// Create an embedder for the given backend and model
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(AdvisorError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// Embed a query string
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let request = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AdvisorError::RetrievalUnavailable(format!(
                "Embedding request failed: {}",
                e
            )))?;

        if !response.status().is_success() {
            return Err(AdvisorError::RetrievalUnavailable(format!(
                "Embedding backend returned HTTP {}",
                response.status()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::RetrievalUnavailable(format!(
                "Malformed embedding response: {}",
                e
            )))?;

        Ok(body.embedding)
    }
}

/// Qdrant-backed retrieval over the ingested catalog collection
pub struct QdrantRetriever {
    client: QdrantClient,
    embedder: OllamaEmbedder,
    collection: String,
}

impl QdrantRetriever {
    /// Connect to Qdrant and the embedding backend
    pub fn new(qdrant_url: &str, embedder: OllamaEmbedder, collection: &str) -> Result<Self> {
        let client = QdrantClient::from_url(qdrant_url)
            .build()
            .map_err(|e| AdvisorError::RetrievalUnavailable(format!(
                "Failed to create Qdrant client: {}",
                e
            )))?;

        Ok(Self {
            client,
            embedder,
            collection: collection.to_string(),
        })
    }
}

#[async_trait]
impl RetrievalPort for QdrantRetriever {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        let embedding = self.embedder.embed(query).await?;

        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: embedding,
                limit: k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| AdvisorError::RetrievalUnavailable(format!(
                "Qdrant search failed: {}",
                e
            )))?;

        let passages = search_result
            .result
            .into_iter()
            .map(|point| {
                let text = point
                    .payload
                    .get("document")
                    .and_then(qdrant_value_to_string)
                    .unwrap_or_default();

                let source = point
                    .payload
                    .get("source")
                    .and_then(qdrant_value_to_string)
                    .unwrap_or_else(|| {
                        point
                            .payload
                            .get("page")
                            .and_then(qdrant_value_to_string)
                            .map(|p| format!("catalog p.{}", p))
                            .unwrap_or_else(|| "catalog".to_string())
                    });

                Passage {
                    text,
                    score: point.score,
                    source,
                }
            })
            .filter(|p| !p.text.is_empty())
            .collect();

        Ok(passages)
    }
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(s.clone()),
        Kind::IntegerValue(i) => Some(i.to_string()),
        _ => None,
    })
}

/// Format passages for inclusion in a generation prompt
pub fn format_passages(passages: &[Passage]) -> String {
    if passages.is_empty() {
        return "No relevant catalog passages found.".to_string();
    }

    let mut formatted = Vec::new();
    for (i, passage) in passages.iter().enumerate() {
        formatted.push(format!("[Passage {} - {}]", i + 1, passage.source));
        formatted.push(passage.text.clone());
        formatted.push(String::new());
    }

    formatted.join("\n")
}

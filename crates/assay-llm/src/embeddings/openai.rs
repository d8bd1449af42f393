//! OpenAI-compatible embeddings.

use std::sync::Arc;

use assay_core::{EmbeddingProvider, StageError, StageResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::OpenAIProviderConfig;
use crate::generation::{build_client, classify_status};
use crate::rate_limit::RateLimiter;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Embedding provider speaking the `/v1/embeddings` protocol. Batches are
/// sent in a single request; the response is re-ordered by index before
/// returning.
pub struct OpenAIEmbeddings {
    config: OpenAIProviderConfig,
    client: reqwest::Client,
    limiter: Option<Arc<RateLimiter>>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAIEmbeddings {
    pub fn new(config: OpenAIProviderConfig) -> Result<Self, StageError> {
        let client = build_client(&config.api_key, config.timeout_secs)?;
        Ok(Self {
            config,
            client,
            limiter: None,
        })
    }

    /// Share a call budget with other provider handles.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/v1/embeddings")
    }

    async fn request(&self, input: &[String]) -> StageResult<Vec<Vec<f32>>> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }
        let response = self
            .client
            .post(self.endpoint())
            .json(&json!({
                "model": self.config.embedding_model,
                "input": input,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }
        let mut parsed: EmbeddingsResponse = response.json().await?;
        if parsed.data.len() != input.len() {
            return Err(StageError::MalformedOutput(format!(
                "asked for {} embeddings, got {}",
                input.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|datum| datum.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddings {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.embedding_model
    }

    fn dimensions(&self) -> usize {
        match self.config.embedding_model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        }
    }

    async fn embed(&self, text: &str) -> StageResult<Vec<f32>> {
        let input = [text.to_string()];
        let mut vectors = self.request(&input).await?;
        vectors
            .pop()
            .ok_or_else(|| StageError::MalformedOutput("embedding response was empty".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> StageResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), model = %self.config.embedding_model, "embedding batch");
        self.request(texts).await
    }

    async fn health_check(&self) -> bool {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        match self.client.get(format!("{base}/v1/models")).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for OpenAIEmbeddings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIEmbeddings")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.embedding_model)
            .finish()
    }
}

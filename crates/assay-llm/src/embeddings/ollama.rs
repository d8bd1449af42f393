//! Ollama embeddings over the local HTTP API.

use std::sync::Arc;
use std::time::Duration;

use assay_core::{EmbeddingProvider, StageError, StageResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::OllamaProviderConfig;
use crate::rate_limit::RateLimiter;

/// Embedding provider backed by an Ollama server's `/api/embeddings`
/// endpoint. The endpoint takes one prompt per call, so batches are issued
/// sequentially.
pub struct OllamaEmbeddings {
    config: OllamaProviderConfig,
    client: reqwest::Client,
    limiter: Option<Arc<RateLimiter>>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbeddings {
    pub fn new(config: OllamaProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            limiter: None,
        }
    }

    /// Share a call budget with other provider handles.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/api/embeddings",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.embedding_model
    }

    fn dimensions(&self) -> usize {
        match self.config.embedding_model.as_str() {
            "mxbai-embed-large" => 1024,
            "all-minilm" => 384,
            _ => 768,
        }
    }

    async fn embed(&self, text: &str) -> StageResult<Vec<f32>> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }
        let response = self
            .client
            .post(self.endpoint())
            .json(&json!({
                "model": self.config.embedding_model,
                "prompt": text,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(crate::generation::classify_status(status, &body));
        }
        let parsed: EmbeddingResponse = response.json().await?;
        if parsed.embedding.is_empty() {
            return Err(StageError::MalformedOutput(
                "embedding response was empty".into(),
            ));
        }
        Ok(parsed.embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> StageResult<Vec<Vec<f32>>> {
        debug!(count = texts.len(), model = %self.config.embedding_model, "embedding batch");
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url.trim_end_matches('/'));
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for OllamaEmbeddings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaEmbeddings")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.embedding_model)
            .finish()
    }
}

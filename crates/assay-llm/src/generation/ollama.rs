//! Ollama chat generation over the local HTTP API.

use std::sync::Arc;
use std::time::Duration;

use assay_core::{GenerationProvider, StageResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::OllamaProviderConfig;
use crate::rate_limit::RateLimiter;

/// Generation provider backed by an Ollama server's `/api/chat` endpoint.
pub struct OllamaGeneration {
    config: OllamaProviderConfig,
    client: reqwest::Client,
    limiter: Option<Arc<RateLimiter>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OllamaGeneration {
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

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl GenerationProvider for OllamaGeneration {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> StageResult<String> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        debug!(model = %self.config.model, prompt_chars = prompt.len(), "ollama chat request");
        let response = self
            .client
            .post(self.endpoint("api/chat"))
            .json(&json!({
                "model": self.config.model,
                "messages": messages,
                "stream": false,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(super::classify_status(status, &body));
        }
        let parsed: ChatResponse = response.json().await?;
        Ok(parsed.message.content)
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        system: Option<&str>,
        schema: &Value,
    ) -> StageResult<Value> {
        super::generate_structured_with_retry(self, prompt, system, schema).await
    }

    async fn health_check(&self) -> bool {
        match self.client.get(self.endpoint("api/tags")).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for OllamaGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaGeneration")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

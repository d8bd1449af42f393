//! OpenAI-compatible chat completion provider.

use std::sync::Arc;
use std::time::Duration;

use assay_core::{GenerationProvider, StageError, StageResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::OpenAIProviderConfig;
use crate::rate_limit::RateLimiter;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Generation provider speaking the `/v1/chat/completions` protocol. Works
/// against OpenAI itself or any compatible server via `base_url`.
pub struct OpenAIGeneration {
    config: OpenAIProviderConfig,
    client: reqwest::Client,
    limiter: Option<Arc<RateLimiter>>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl OpenAIGeneration {
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

    fn endpoint(&self, path: &str) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/{path}")
    }
}

pub(crate) fn build_client(api_key: &str, timeout_secs: u64) -> Result<reqwest::Client, StageError> {
    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|_| StageError::Unrecoverable("API key is not a valid header value".into()))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| StageError::Unrecoverable(format!("failed to build HTTP client: {e}")))
}

#[async_trait]
impl GenerationProvider for OpenAIGeneration {
    fn name(&self) -> &str {
        "openai"
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

        debug!(model = %self.config.model, prompt_chars = prompt.len(), "chat completion request");
        let response = self
            .client
            .post(self.endpoint("v1/chat/completions"))
            .json(&json!({
                "model": self.config.model,
                "messages": messages,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(super::classify_status(status, &body));
        }
        let parsed: CompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| StageError::MalformedOutput("completion had no choices".into()))
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
        match self.client.get(self.endpoint("v1/models")).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for OpenAIGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIGeneration")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

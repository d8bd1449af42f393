//! Generation and embedding provider abstractions.

use crate::error::StageResult;
use async_trait::async_trait;
use serde_json::Value;

/// Text generation provider (chat-style completion).
///
/// `generate_structured` must return a JSON object conforming to the schema
/// described in the prompt; providers are expected to apply their own
/// best-effort repair before classifying output as malformed.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name for logging (e.g. "ollama", "openai").
    fn name(&self) -> &str;

    /// Model identifier this provider is configured with.
    fn model(&self) -> &str;

    /// Generate a plain text completion.
    async fn generate(&self, prompt: &str, system: Option<&str>) -> StageResult<String>;

    /// Generate structured JSON output. `schema` is advisory: it is rendered
    /// into the prompt, and the parsed value is validated by the caller's
    /// deserialisation.
    async fn generate_structured(
        &self,
        prompt: &str,
        system: Option<&str>,
        schema: &Value,
    ) -> StageResult<Value>;

    /// Whether the provider currently answers requests.
    async fn health_check(&self) -> bool;
}

/// Text embedding provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Embedding vector length.
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> StageResult<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> StageResult<Vec<Vec<f32>>>;

    async fn health_check(&self) -> bool;
}

//! # Assay LLM
//!
//! Generation and embedding providers for the Assay knowledge-base engine.
//!
//! ## Features
//!
//! - **Multi-provider**: Ollama and OpenAI-compatible endpoints, plus
//!   deterministic mocks for tests
//! - **Structured output**: JSON generation with best-effort repair of
//!   fenced or truncated responses, bounded retry with a stricter prompt
//! - **Rate limiting**: a process-wide per-minute call budget shared by every
//!   provider handle, enforced as a scheduling policy
//! - **Explicit selection**: providers live in a [`ProviderRegistry`] value
//!   passed into each pipeline or query invocation; there is no global
//!   default-provider state
//!
//! ## Example
//!
//! ```rust,no_run
//! use assay_llm::{ProviderConfig, ProviderRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ProviderConfig::ollama("http://localhost:11434".into());
//!     let registry = ProviderRegistry::builder()
//!         .generation("ollama", assay_llm::create_generation_provider(&config)?)
//!         .build();
//!     let provider = registry.generation(None)?;
//!     let answer = provider.generate("Summarise the outlook.", None).await?;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod embeddings;
pub mod generation;
pub mod json_repair;
pub mod mock;
pub mod rate_limit;
pub mod registry;

pub use config::{OllamaProviderConfig, OpenAIProviderConfig, ProviderConfig};
pub use mock::{MockEmbeddingProvider, MockGenerationProvider};
pub use rate_limit::RateLimiter;
pub use registry::ProviderRegistry;

use assay_core::{EmbeddingProvider, GenerationProvider, StageError};
use std::sync::Arc;

/// Create a generation provider from configuration.
pub fn create_generation_provider(
    config: &ProviderConfig,
) -> Result<Arc<dyn GenerationProvider>, StageError> {
    create_generation_provider_with_limiter(config, None)
}

/// Create a generation provider sharing a process-wide call budget. The same
/// limiter handle can be passed to every provider so concurrent pipeline
/// stages draw from one per-minute window.
pub fn create_generation_provider_with_limiter(
    config: &ProviderConfig,
    limiter: Option<Arc<RateLimiter>>,
) -> Result<Arc<dyn GenerationProvider>, StageError> {
    match config {
        ProviderConfig::Ollama(cfg) => {
            let mut provider = generation::OllamaGeneration::new(cfg.clone());
            if let Some(limiter) = limiter {
                provider = provider.with_rate_limiter(limiter);
            }
            Ok(Arc::new(provider))
        }
        ProviderConfig::OpenAI(cfg) => {
            let mut provider = generation::OpenAIGeneration::new(cfg.clone())?;
            if let Some(limiter) = limiter {
                provider = provider.with_rate_limiter(limiter);
            }
            Ok(Arc::new(provider))
        }
        ProviderConfig::Mock => Ok(Arc::new(MockGenerationProvider::default())),
    }
}

/// Create an embedding provider from configuration.
pub fn create_embedding_provider(
    config: &ProviderConfig,
) -> Result<Arc<dyn EmbeddingProvider>, StageError> {
    create_embedding_provider_with_limiter(config, None)
}

/// Embedding-side counterpart of
/// [`create_generation_provider_with_limiter`].
pub fn create_embedding_provider_with_limiter(
    config: &ProviderConfig,
    limiter: Option<Arc<RateLimiter>>,
) -> Result<Arc<dyn EmbeddingProvider>, StageError> {
    match config {
        ProviderConfig::Ollama(cfg) => {
            let mut provider = embeddings::OllamaEmbeddings::new(cfg.clone());
            if let Some(limiter) = limiter {
                provider = provider.with_rate_limiter(limiter);
            }
            Ok(Arc::new(provider))
        }
        ProviderConfig::OpenAI(cfg) => {
            let mut provider = embeddings::OpenAIEmbeddings::new(cfg.clone())?;
            if let Some(limiter) = limiter {
                provider = provider.with_rate_limiter(limiter);
            }
            Ok(Arc::new(provider))
        }
        ProviderConfig::Mock => Ok(Arc::new(MockEmbeddingProvider::with_dimensions(384))),
    }
}

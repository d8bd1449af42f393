//! Explicit provider registry.
//!
//! A registry is an ordinary value built once at startup and passed into
//! whatever needs providers. There is no process-global registry and no
//! hidden default: the first provider registered becomes the default unless
//! one is named explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use assay_core::{EmbeddingProvider, GenerationProvider, StageError, StageResult};

/// Named generation and embedding providers with a default for each kind.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    generation: HashMap<String, Arc<dyn GenerationProvider>>,
    embedding: HashMap<String, Arc<dyn EmbeddingProvider>>,
    default_generation: Option<String>,
    default_embedding: Option<String>,
}

impl ProviderRegistry {
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    /// Look up a generation provider by name, or the default when `None`.
    pub fn generation(&self, name: Option<&str>) -> StageResult<Arc<dyn GenerationProvider>> {
        let key = name
            .or(self.default_generation.as_deref())
            .ok_or_else(|| StageError::Unrecoverable("no generation provider configured".into()))?;
        self.generation.get(key).cloned().ok_or_else(|| {
            StageError::Unrecoverable(format!("unknown generation provider '{key}'"))
        })
    }

    /// Look up an embedding provider by name, or the default when `None`.
    pub fn embedding(&self, name: Option<&str>) -> StageResult<Arc<dyn EmbeddingProvider>> {
        let key = name
            .or(self.default_embedding.as_deref())
            .ok_or_else(|| StageError::Unrecoverable("no embedding provider configured".into()))?;
        self.embedding
            .get(key)
            .cloned()
            .ok_or_else(|| StageError::Unrecoverable(format!("unknown embedding provider '{key}'")))
    }

    /// Registered generation provider names.
    pub fn generation_names(&self) -> Vec<&str> {
        self.generation.keys().map(String::as_str).collect()
    }

    /// Registered embedding provider names.
    pub fn embedding_names(&self) -> Vec<&str> {
        self.embedding.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("generation", &self.generation_names())
            .field("embedding", &self.embedding_names())
            .field("default_generation", &self.default_generation)
            .field("default_embedding", &self.default_embedding)
            .finish()
    }
}

#[derive(Default)]
pub struct ProviderRegistryBuilder {
    registry: ProviderRegistry,
}

impl ProviderRegistryBuilder {
    /// Register a generation provider. The first one registered is the
    /// default until [`default_generation`](Self::default_generation) says
    /// otherwise.
    pub fn generation(
        mut self,
        name: impl Into<String>,
        provider: Arc<dyn GenerationProvider>,
    ) -> Self {
        let name = name.into();
        if self.registry.default_generation.is_none() {
            self.registry.default_generation = Some(name.clone());
        }
        self.registry.generation.insert(name, provider);
        self
    }

    /// Register an embedding provider.
    pub fn embedding(
        mut self,
        name: impl Into<String>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let name = name.into();
        if self.registry.default_embedding.is_none() {
            self.registry.default_embedding = Some(name.clone());
        }
        self.registry.embedding.insert(name, provider);
        self
    }

    /// Override the default generation provider.
    pub fn default_generation(mut self, name: impl Into<String>) -> Self {
        self.registry.default_generation = Some(name.into());
        self
    }

    /// Override the default embedding provider.
    pub fn default_embedding(mut self, name: impl Into<String>) -> Self {
        self.registry.default_embedding = Some(name.into());
        self
    }

    pub fn build(self) -> ProviderRegistry {
        self.registry
    }
}

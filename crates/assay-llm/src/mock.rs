//! Deterministic in-process providers for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use assay_core::{EmbeddingProvider, GenerationProvider, StageError, StageResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Scripted generation provider. Responses are consumed in order; once the
/// script runs out every call echoes a canned acknowledgement. Failures can
/// be queued the same way to exercise error paths.
#[derive(Default)]
pub struct MockGenerationProvider {
    script: Mutex<VecDeque<StageResult<String>>>,
    calls: AtomicUsize,
}

impl MockGenerationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn push_response(&self, response: impl Into<String>) {
        self.script.lock().push_back(Ok(response.into()));
    }

    /// Queue a failure.
    pub fn push_failure(&self, error: StageError) {
        self.script.lock().push_back(Err(error));
    }

    /// Number of generate calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for MockGenerationProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, _prompt: &str, _system: Option<&str>) -> StageResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().pop_front() {
            Some(result) => result,
            None => Ok("mock response".to_string()),
        }
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        system: Option<&str>,
        _schema: &Value,
    ) -> StageResult<Value> {
        let raw = self.generate(prompt, system).await?;
        crate::json_repair::parse_lenient(&raw)
            .ok_or_else(|| StageError::MalformedOutput("mock response was not JSON".into()))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Embedding provider that derives a deterministic vector from the input
/// text, so identical chunks always embed identically.
pub struct MockEmbeddingProvider {
    dimensions: usize,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        // FNV-1a seeded walk keeps vectors stable across runs.
        let mut state: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.bytes() {
            state ^= u64::from(byte);
            state = state.wrapping_mul(0x0000_0100_0000_01b3);
        }
        (0..self.dimensions)
            .map(|i| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(i as u64);
                ((state >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::with_dimensions(384)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-embed"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> StageResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> StageResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Convenience for tests that need a structured extraction response.
pub fn empty_extraction_json() -> Value {
    json!({
        "companies": [],
        "industries": [],
        "themes": [],
        "target_prices": [],
        "opinions": [],
    })
}

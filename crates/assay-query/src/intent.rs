//! Question intent classification.

use std::sync::Arc;

use assay_core::GenerationProvider;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

/// Which retrieval side a question leans on. Recorded for observability;
/// the default retrieval plan still consults both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    /// Relational questions (who supplies whom, which companies share an
    /// industry).
    Graph,
    /// Semantic questions over report prose.
    Vector,
    /// Anything mixed or unclear.
    Hybrid,
}

impl QueryIntent {
    /// Confidence assigned when the classifier fails or omits one.
    pub const DEFAULT_CONFIDENCE: f64 = 0.5;

    pub fn as_str(self) -> &'static str {
        match self {
            QueryIntent::Graph => "graph",
            QueryIntent::Vector => "vector",
            QueryIntent::Hybrid => "hybrid",
        }
    }
}

const SYSTEM: &str = "You classify questions about equity research reports by which \
retrieval strategy suits them: graph for relational questions, vector for semantic \
questions over prose, hybrid for anything mixed.";

#[derive(Deserialize)]
struct Classification {
    intent: String,
    confidence: Option<f64>,
}

/// LLM-backed classifier. Any failure degrades to `Hybrid` at default
/// confidence; classification is advisory and must never sink a query.
#[derive(Clone)]
pub struct IntentClassifier {
    provider: Arc<dyn GenerationProvider>,
}

impl IntentClassifier {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    /// Same classifier against a different provider, for per-query override.
    pub fn with_provider(&self, provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    /// Classify, falling back to hybrid. The error string, when any, is
    /// returned alongside so the caller can record it.
    pub async fn classify(&self, question: &str) -> (QueryIntent, f64, Option<String>) {
        let schema = json!({
            "type": "object",
            "properties": {
                "intent": {"type": "string", "enum": ["graph", "vector", "hybrid"]},
                "confidence": {"type": "number"}
            },
            "required": ["intent"]
        });
        let prompt = format!("Classify this question:\n{question}");

        let value = match self
            .provider
            .generate_structured(&prompt, Some(SYSTEM), &schema)
            .await
        {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "intent classification failed, defaulting to hybrid");
                return (
                    QueryIntent::Hybrid,
                    QueryIntent::DEFAULT_CONFIDENCE,
                    Some(err.to_string()),
                );
            }
        };

        let parsed: Classification = match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "intent response shape mismatch, defaulting to hybrid");
                return (
                    QueryIntent::Hybrid,
                    QueryIntent::DEFAULT_CONFIDENCE,
                    Some(err.to_string()),
                );
            }
        };

        let intent = match parsed.intent.as_str() {
            "graph" => QueryIntent::Graph,
            "vector" => QueryIntent::Vector,
            _ => QueryIntent::Hybrid,
        };
        let confidence = parsed
            .confidence
            .filter(|c| (0.0..=1.0).contains(c))
            .unwrap_or(QueryIntent::DEFAULT_CONFIDENCE);
        debug!(intent = intent.as_str(), confidence, "classified question");
        (intent, confidence, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assay_llm::MockGenerationProvider;

    #[tokio::test]
    async fn parses_intent_and_confidence() {
        let provider = MockGenerationProvider::new();
        provider.push_response(r#"{"intent": "graph", "confidence": 0.92}"#);
        let classifier = IntentClassifier::new(Arc::new(provider));
        let (intent, confidence, error) = classifier.classify("who supplies Acme?").await;
        assert_eq!(intent, QueryIntent::Graph);
        assert_eq!(confidence, 0.92);
        assert!(error.is_none());
    }

    #[tokio::test]
    async fn missing_confidence_defaults() {
        let provider = MockGenerationProvider::new();
        provider.push_response(r#"{"intent": "vector"}"#);
        let classifier = IntentClassifier::new(Arc::new(provider));
        let (intent, confidence, _) = classifier.classify("summarise the outlook").await;
        assert_eq!(intent, QueryIntent::Vector);
        assert_eq!(confidence, QueryIntent::DEFAULT_CONFIDENCE);
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_hybrid() {
        let provider = MockGenerationProvider::new();
        provider.push_failure(assay_core::StageError::Transient("down".into()));
        let classifier = IntentClassifier::new(Arc::new(provider));
        let (intent, confidence, error) = classifier.classify("anything").await;
        assert_eq!(intent, QueryIntent::Hybrid);
        assert_eq!(confidence, QueryIntent::DEFAULT_CONFIDENCE);
        assert!(error.is_some());
    }

    #[tokio::test]
    async fn unknown_intent_string_becomes_hybrid() {
        let provider = MockGenerationProvider::new();
        provider.push_response(r#"{"intent": "telepathy", "confidence": 0.99}"#);
        let classifier = IntentClassifier::new(Arc::new(provider));
        let (intent, _, _) = classifier.classify("anything").await;
        assert_eq!(intent, QueryIntent::Hybrid);
    }
}

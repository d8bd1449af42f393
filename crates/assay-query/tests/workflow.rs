//! Workflow-level tests: the run must always return a response, whatever
//! fails underneath it.

use std::sync::Arc;

use assay_core::{
    GraphStore, ReportId, StageError, VectorPoint, VectorSearchHit, VectorStore,
};
use assay_llm::{MockEmbeddingProvider, MockGenerationProvider, ProviderRegistry};
use assay_qdrant::VectorService;
use assay_query::synthesize::FALLBACK_ANSWER;
use assay_query::{
    AnswerSynthesizer, GraphRetriever, HybridRetriever, IntentClassifier, QueryIntent,
    QueryOptions, QueryWorkflow, Source, VectorRetriever,
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

struct CannedGraphStore {
    rows: Vec<Map<String, Value>>,
    fail: bool,
}

#[async_trait]
impl GraphStore for CannedGraphStore {
    async fn execute_read(
        &self,
        _query: &str,
        _params: Value,
    ) -> Result<Vec<Map<String, Value>>, StageError> {
        if self.fail {
            return Err(StageError::Transient("graph db unreachable".into()));
        }
        Ok(self.rows.clone())
    }

    async fn execute_write(
        &self,
        _query: &str,
        _params: Value,
    ) -> Result<Vec<Map<String, Value>>, StageError> {
        Ok(Vec::new())
    }
}

struct CannedVectorStore {
    hits: Vec<VectorSearchHit>,
    fail: bool,
}

#[async_trait]
impl VectorStore for CannedVectorStore {
    async fn upsert(&self, _points: Vec<VectorPoint>) -> Result<(), StageError> {
        Ok(())
    }

    async fn search(
        &self,
        _vector: Vec<f32>,
        _limit: usize,
        _score_threshold: f32,
        _filter: Option<Map<String, Value>>,
    ) -> Result<Vec<VectorSearchHit>, StageError> {
        if self.fail {
            return Err(StageError::Transient("qdrant unreachable".into()));
        }
        Ok(self.hits.clone())
    }

    async fn delete_by_report(&self, _report_id: ReportId) -> Result<u64, StageError> {
        Ok(0)
    }
}

fn chunk_hit(text: &str) -> VectorSearchHit {
    let mut payload = Map::new();
    payload.insert("text".into(), json!(text));
    payload.insert("report_id".into(), json!("r-1"));
    payload.insert("title".into(), json!("Acme Q3"));
    payload.insert("page_number".into(), json!(2));
    VectorSearchHit {
        id: "chunk-0".into(),
        score: 0.88,
        payload,
    }
}

fn graph_row(ticker: &str, rating: &str) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("ticker".into(), json!(ticker));
    row.insert("rating".into(), json!(rating));
    row
}

fn workflow(
    provider: MockGenerationProvider,
    graph: CannedGraphStore,
    vectors: CannedVectorStore,
) -> QueryWorkflow {
    let provider: Arc<MockGenerationProvider> = Arc::new(provider);
    let graph_store: Arc<dyn GraphStore> = Arc::new(graph);
    let vector_service = Arc::new(VectorService::new(
        Arc::new(vectors),
        Arc::new(MockEmbeddingProvider::with_dimensions(8)),
    ));
    QueryWorkflow::new(
        IntentClassifier::new(provider.clone()),
        HybridRetriever::new(
            GraphRetriever::new(provider.clone(), graph_store),
            VectorRetriever::new(vector_service),
        ),
        AnswerSynthesizer::new(provider),
    )
}

#[tokio::test]
async fn hybrid_run_carries_sources_from_both_sides() {
    let provider = MockGenerationProvider::new();
    provider.push_response(r#"{"intent": "hybrid", "confidence": 0.8}"#);
    provider.push_response("MATCH (c:Company)-[:HAS_OPINION]->(o) RETURN c.ticker AS ticker, o.rating AS rating");
    provider.push_response("Both reports rate Acme a buy.");

    let wf = workflow(
        provider,
        CannedGraphStore {
            rows: vec![graph_row("ACM", "buy")],
            fail: false,
        },
        CannedVectorStore {
            hits: vec![chunk_hit("We rate Acme a buy.")],
            fail: false,
        },
    );
    let response = wf.run("what is the rating on Acme?").await;

    assert_eq!(response.intent, QueryIntent::Hybrid);
    assert_eq!(response.answer, "Both reports rate Acme a buy.");
    assert!(response.errors.is_empty());
    assert!(response
        .sources
        .iter()
        .any(|s| matches!(s, Source::ReportChunk { .. })));
    assert!(response
        .sources
        .iter()
        .any(|s| matches!(s, Source::GraphNode { .. })));
}

#[tokio::test]
async fn conflicting_opinions_both_surface_as_sources() {
    let provider = MockGenerationProvider::new();
    provider.push_response(r#"{"intent": "graph", "confidence": 0.9}"#);
    provider.push_response("MATCH (c:Company)-[:HAS_OPINION]->(o) RETURN c.ticker AS ticker, o.rating AS rating");
    provider.push_response("One report says buy, another says hold.");

    let wf = workflow(
        provider,
        CannedGraphStore {
            rows: vec![graph_row("ACM", "buy"), graph_row("ACM", "hold")],
            fail: false,
        },
        CannedVectorStore {
            hits: vec![],
            fail: false,
        },
    );
    let response = wf.run("what do analysts think of Acme?").await;

    let ratings: Vec<&str> = response
        .sources
        .iter()
        .filter_map(|s| match s {
            Source::GraphNode { label, identifier } if label == "rating" => {
                Some(identifier.as_str())
            }
            _ => None,
        })
        .collect();
    assert!(ratings.contains(&"buy"));
    assert!(ratings.contains(&"hold"));
}

#[tokio::test]
async fn one_dead_side_still_answers_from_the_other() {
    let provider = MockGenerationProvider::new();
    provider.push_response(r#"{"intent": "hybrid"}"#);
    provider.push_failure(StageError::Transient("llm hiccup".into()));
    provider.push_response("Margins should widen.");

    let wf = workflow(
        provider,
        CannedGraphStore {
            rows: vec![],
            fail: false,
        },
        CannedVectorStore {
            hits: vec![chunk_hit("Margins should widen through H2.")],
            fail: false,
        },
    );
    let response = wf.run("what happens to margins?").await;

    assert_eq!(response.answer, "Margins should widen.");
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].starts_with("cypher_generation"));
    assert!(!response.sources.is_empty());
}

#[tokio::test]
async fn everything_failing_still_returns_a_response() {
    let provider = MockGenerationProvider::new();
    provider.push_failure(StageError::Transient("llm down".into()));
    provider.push_failure(StageError::Transient("llm down".into()));

    let wf = workflow(
        provider,
        CannedGraphStore {
            rows: vec![],
            fail: true,
        },
        CannedVectorStore {
            hits: vec![],
            fail: true,
        },
    );
    let response = wf.run("anything at all").await;

    assert_eq!(response.answer, FALLBACK_ANSWER);
    assert_eq!(response.intent, QueryIntent::Hybrid);
    assert_eq!(response.intent_confidence, QueryIntent::DEFAULT_CONFIDENCE);
    // Intent, cypher generation, and vector retrieval each recorded a
    // failure; nothing panicked and nothing was silently swallowed.
    assert!(response.errors.len() >= 3);
}

#[tokio::test]
async fn named_provider_override_routes_every_generation_call() {
    let default_provider = Arc::new(MockGenerationProvider::new());

    let alt = Arc::new(MockGenerationProvider::new());
    alt.push_response(r#"{"intent": "vector", "confidence": 0.7}"#);
    alt.push_response("MATCH (c:Company) RETURN c.ticker AS ticker");
    alt.push_response("Answer from the alternative model.");

    let graph_store: Arc<dyn GraphStore> = Arc::new(CannedGraphStore {
        rows: vec![],
        fail: false,
    });
    let vector_service = Arc::new(VectorService::new(
        Arc::new(CannedVectorStore {
            hits: vec![chunk_hit("Margins should widen.")],
            fail: false,
        }),
        Arc::new(MockEmbeddingProvider::with_dimensions(8)),
    ));
    let registry = ProviderRegistry::builder()
        .generation("default", default_provider.clone())
        .generation("alt", alt.clone())
        .build();
    let wf = QueryWorkflow::new(
        IntentClassifier::new(default_provider.clone()),
        HybridRetriever::new(
            GraphRetriever::new(default_provider.clone(), graph_store),
            VectorRetriever::new(vector_service),
        ),
        AnswerSynthesizer::new(default_provider.clone()),
    )
    .with_registry(registry);

    let options = QueryOptions {
        conversation_id: Some("conv-7".into()),
        provider: Some("alt".into()),
    };
    let response = wf.run_with("what happens to margins?", options).await;

    assert_eq!(response.answer, "Answer from the alternative model.");
    assert_eq!(response.conversation_id.as_deref(), Some("conv-7"));
    assert_eq!(default_provider.call_count(), 0);
    assert_eq!(alt.call_count(), 3);
}

#[tokio::test]
async fn unknown_provider_name_degrades_to_the_default() {
    let provider = MockGenerationProvider::new();
    provider.push_response(r#"{"intent": "hybrid", "confidence": 0.8}"#);
    provider.push_response("MATCH (c:Company) RETURN c.ticker AS ticker");
    provider.push_response("Answer from the default model.");

    let wf = workflow(
        provider,
        CannedGraphStore {
            rows: vec![graph_row("ACM", "buy")],
            fail: false,
        },
        CannedVectorStore {
            hits: vec![],
            fail: false,
        },
    );
    let options = QueryOptions {
        conversation_id: None,
        provider: Some("no-such-provider".into()),
    };
    let response = wf.run_with("what is the rating?", options).await;

    assert_eq!(response.answer, "Answer from the default model.");
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].starts_with("provider_selection"));
}

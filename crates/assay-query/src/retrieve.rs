//! Retrieval: graph text-to-Cypher, vector similarity, and the parallel
//! combination of both.

use std::sync::Arc;

use assay_core::{GenerationProvider, GraphStore, StageError, StageResult, VectorSearchHit};
use assay_qdrant::VectorService;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::state::QueryState;

const CYPHER_SYSTEM: &str = "You translate questions about equity research into read-only \
Cypher queries over this schema: (Report {id, title}), (Company {ticker, name, industry}), \
(Industry {name}), (Theme {name}), (TargetPrice {value, currency}), (Opinion {rating}). \
Relationships: MENTIONS, COVERS, DISCUSSES, BELONGS_TO, HAS_TARGET_PRICE, HAS_OPINION, \
STATES. Reply with the Cypher query only, no explanation.";

/// Keywords that make a generated query a write (or a procedure call).
/// Rejected outright; the query path never mutates the graph.
const FORBIDDEN: &[&str] = &[
    "create", "merge", "delete", "detach", "set", "remove", "drop", "load", "call",
];

/// Text-to-Cypher retrieval. Generation and execution fail separately so the
/// caller can tell a bad translation from a dead database.
#[derive(Clone)]
pub struct GraphRetriever {
    provider: Arc<dyn GenerationProvider>,
    store: Arc<dyn GraphStore>,
    row_limit: usize,
}

impl GraphRetriever {
    pub fn new(provider: Arc<dyn GenerationProvider>, store: Arc<dyn GraphStore>) -> Self {
        Self {
            provider,
            store,
            row_limit: 25,
        }
    }

    pub fn with_provider(&self, provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            provider,
            store: self.store.clone(),
            row_limit: self.row_limit,
        }
    }

    /// Ask the model for a Cypher query and validate it is read-only.
    pub async fn generate_cypher(&self, question: &str) -> StageResult<String> {
        let prompt = format!("Write a Cypher query answering:\n{question}");
        let raw = self.provider.generate(&prompt, Some(CYPHER_SYSTEM)).await?;
        let query = strip_fences(&raw);
        validate_read_only(&query)?;
        debug!(query = %query, "generated cypher");
        Ok(query)
    }

    /// Run a validated query, capping the row count.
    pub async fn execute(&self, query: &str) -> StageResult<Vec<Map<String, Value>>> {
        let query = if query.to_lowercase().contains("limit") {
            query.to_string()
        } else {
            format!("{query} LIMIT {}", self.row_limit)
        };
        self.store.execute_read(&query, Value::Null).await
    }

    /// Both steps chained; each failure keeps its own step name.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<Map<String, Value>>, String> {
        let query = self
            .generate_cypher(question)
            .await
            .map_err(|e| format!("cypher_generation: {e}"))?;
        self.execute(&query)
            .await
            .map_err(|e| format!("cypher_execution: {e}"))
    }
}

fn strip_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    trimmed
        .trim_start_matches("```cypher")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .to_string()
}

fn validate_read_only(query: &str) -> StageResult<()> {
    let lowered = query.to_lowercase();
    if !lowered.trim_start().starts_with("match") {
        return Err(StageError::MalformedOutput(format!(
            "generated query does not start with MATCH: {query}"
        )));
    }
    // Token-level match so identifiers like `n.asset` do not trip `set`.
    for token in lowered.split(|c: char| !c.is_ascii_alphanumeric()) {
        if FORBIDDEN.contains(&token) {
            return Err(StageError::MalformedOutput(format!(
                "generated query contains write clause '{token}'"
            )));
        }
    }
    Ok(())
}

/// Similarity retrieval over the chunk store.
#[derive(Clone)]
pub struct VectorRetriever {
    vectors: Arc<VectorService>,
    limit: usize,
}

impl VectorRetriever {
    pub fn new(vectors: Arc<VectorService>) -> Self {
        Self { vectors, limit: 8 }
    }

    pub async fn retrieve(&self, question: &str) -> StageResult<Vec<VectorSearchHit>> {
        self.vectors.search_similar(question, self.limit, None).await
    }
}

/// Runs both retrievers concurrently and folds whatever came back into the
/// query state. A side that fails contributes an error entry instead of
/// results; both failing leaves the state evidence-free but intact.
#[derive(Clone)]
pub struct HybridRetriever {
    graph: GraphRetriever,
    vector: VectorRetriever,
}

impl HybridRetriever {
    pub fn new(graph: GraphRetriever, vector: VectorRetriever) -> Self {
        Self { graph, vector }
    }

    /// Swap the generation provider on the graph side. The vector side keeps
    /// its embedding provider: stored vectors only match the embedding model
    /// that produced them.
    pub fn with_provider(&self, provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            graph: self.graph.with_provider(provider),
            vector: self.vector.clone(),
        }
    }

    pub async fn retrieve(&self, state: &mut QueryState, use_graph: bool, use_vectors: bool) {
        let graph_fut = async {
            if use_graph {
                Some(self.graph.retrieve(&state.question).await)
            } else {
                None
            }
        };
        let vector_fut = async {
            if use_vectors {
                Some(self.vector.retrieve(&state.question).await)
            } else {
                None
            }
        };
        let (graph_result, vector_result) = futures::join!(graph_fut, vector_fut);

        match graph_result {
            Some(Ok(rows)) => {
                debug!(rows = rows.len(), "graph retrieval succeeded");
                state.graph_rows = rows;
            }
            Some(Err(message)) => {
                warn!(error = %message, "graph retrieval failed");
                state.errors.push(message);
            }
            None => {}
        }
        match vector_result {
            Some(Ok(hits)) => {
                debug!(hits = hits.len(), "vector retrieval succeeded");
                state.vector_hits = hits;
            }
            Some(Err(err)) => {
                warn!(error = %err, "vector retrieval failed");
                state.add_error("vector_retrieval", err);
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_validation_rejects_writes() {
        assert!(validate_read_only("MATCH (c:Company) RETURN c.name").is_ok());
        assert!(validate_read_only("MATCH (n) DETACH DELETE n").is_err());
        assert!(validate_read_only("MERGE (c:Company {ticker: 'X'})").is_err());
        assert!(validate_read_only("RETURN 1").is_err());
        assert!(validate_read_only("MATCH (n) SET n.x = 1 RETURN n").is_err());
        assert!(validate_read_only("MATCH (n) RETURN n.asset AS total").is_ok());
    }

    #[test]
    fn fenced_cypher_is_unwrapped() {
        let raw = "```cypher\nMATCH (c:Company) RETURN c.ticker\n```";
        assert_eq!(strip_fences(raw), "MATCH (c:Company) RETURN c.ticker");
        assert_eq!(strip_fences("MATCH (n) RETURN n"), "MATCH (n) RETURN n");
    }
}

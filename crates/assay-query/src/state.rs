//! Accumulating state for one query run.

use assay_core::VectorSearchHit;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::intent::QueryIntent;

/// Provenance of one piece of evidence behind an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    ReportChunk {
        report_id: String,
        title: Option<String>,
        page_number: Option<u32>,
        score: f32,
    },
    GraphNode {
        label: String,
        identifier: String,
    },
}

/// Mutable state threaded through the workflow steps. Errors accumulate
/// here instead of aborting the run; the invariant is that recording an
/// error never erases results another step already produced.
#[derive(Debug, Default)]
pub struct QueryState {
    pub question: String,
    pub conversation_id: Option<String>,
    pub intent: Option<QueryIntent>,
    pub intent_confidence: Option<f64>,
    pub graph_rows: Vec<Map<String, Value>>,
    pub vector_hits: Vec<VectorSearchHit>,
    pub answer: Option<String>,
    pub sources: Vec<Source>,
    pub errors: Vec<String>,
}

impl QueryState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Record a step failure without touching any accumulated results.
    pub fn add_error(&mut self, step: &str, message: impl std::fmt::Display) {
        self.errors.push(format!("{step}: {message}"));
    }

    pub fn has_evidence(&self) -> bool {
        !self.graph_rows.is_empty() || !self.vector_hits.is_empty()
    }

    pub fn into_response(self) -> QueryResponse {
        QueryResponse {
            question: self.question,
            conversation_id: self.conversation_id,
            intent: self.intent.unwrap_or(QueryIntent::Hybrid),
            intent_confidence: self.intent_confidence.unwrap_or(QueryIntent::DEFAULT_CONFIDENCE),
            answer: self.answer.unwrap_or_default(),
            sources: self.sources,
            errors: self.errors,
        }
    }
}

/// Final answer surface returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub intent: QueryIntent,
    pub intent_confidence: f64,
    pub answer: String,
    pub sources: Vec<Source>,
    pub errors: Vec<String>,
}

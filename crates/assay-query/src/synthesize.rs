//! Answer synthesis from retrieved evidence.

use std::sync::Arc;

use assay_core::GenerationProvider;
use serde_json::Value;
use tracing::warn;

use crate::state::{QueryState, Source};

/// Answer returned when nothing usable could be retrieved or generated.
pub const FALLBACK_ANSWER: &str = "I could not find relevant information in the ingested \
reports to answer this question. Try rephrasing it, or check that the relevant reports \
have been uploaded and completed processing.";

const SYSTEM: &str = "You answer questions about equity research reports using only the \
evidence provided. Cite concrete figures where the evidence contains them. If the evidence \
does not answer the question, say so plainly.";

/// Maximum characters of chunk text quoted into the synthesis prompt.
const MAX_CONTEXT_CHARS: usize = 12_000;

#[derive(Clone)]
pub struct AnswerSynthesizer {
    provider: Arc<dyn GenerationProvider>,
}

impl AnswerSynthesizer {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    pub fn with_provider(&self, provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    /// Fill `state.answer` and `state.sources`. Never fails: provider errors
    /// and empty evidence both degrade to [`FALLBACK_ANSWER`], with the
    /// provider error recorded.
    pub async fn synthesize(&self, state: &mut QueryState) {
        state.sources = collect_sources(state);

        if !state.has_evidence() {
            state.answer = Some(FALLBACK_ANSWER.to_string());
            return;
        }

        let context = build_context(state);
        let prompt = format!(
            "Question:\n{}\n\nEvidence:\n{}\n\nAnswer the question using the evidence above.",
            state.question, context
        );
        match self.provider.generate(&prompt, Some(SYSTEM)).await {
            Ok(answer) if !answer.trim().is_empty() => {
                state.answer = Some(answer);
            }
            Ok(_) => {
                state.add_error("synthesis", "provider returned an empty answer");
                state.answer = Some(FALLBACK_ANSWER.to_string());
            }
            Err(err) => {
                warn!(error = %err, "synthesis failed, using fallback answer");
                state.add_error("synthesis", err);
                state.answer = Some(FALLBACK_ANSWER.to_string());
            }
        }
    }
}

fn build_context(state: &QueryState) -> String {
    let mut sections = Vec::new();

    if !state.graph_rows.is_empty() {
        let rows: Vec<String> = state
            .graph_rows
            .iter()
            .map(|row| serde_json::to_string(row).unwrap_or_default())
            .collect();
        sections.push(format!("Knowledge graph results:\n{}", rows.join("\n")));
    }

    if !state.vector_hits.is_empty() {
        let mut excerpts = Vec::new();
        let mut used = 0usize;
        for hit in &state.vector_hits {
            let text = hit
                .payload
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if text.is_empty() {
                continue;
            }
            if used + text.len() > MAX_CONTEXT_CHARS {
                break;
            }
            used += text.len();
            let title = hit
                .payload
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("unknown report");
            excerpts.push(format!("[{title}, score {:.2}]\n{text}", hit.score));
        }
        sections.push(format!("Report excerpts:\n{}", excerpts.join("\n\n")));
    }

    sections.join("\n\n")
}

/// One source entry per piece of evidence: report chunks from vector hits,
/// graph nodes from any row value that names an entity.
fn collect_sources(state: &QueryState) -> Vec<Source> {
    let mut sources = Vec::new();

    for hit in &state.vector_hits {
        sources.push(Source::ReportChunk {
            report_id: hit
                .payload
                .get("report_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            title: hit
                .payload
                .get("title")
                .and_then(Value::as_str)
                .map(str::to_string),
            page_number: hit
                .payload
                .get("page_number")
                .and_then(Value::as_u64)
                .map(|n| n as u32),
            score: hit.score,
        });
    }

    for row in &state.graph_rows {
        for (column, value) in row {
            if let Some(identifier) = value.as_str() {
                sources.push(Source::GraphNode {
                    label: column.clone(),
                    identifier: identifier.to_string(),
                });
            }
        }
    }

    sources
}

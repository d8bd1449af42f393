//! Chunk, embed, and store report text; semantic search over the result.

use std::sync::Arc;

use assay_core::{
    EmbeddingProvider, ExtractedEntities, ParsedDocument, ReportId, StageResult, VectorPoint,
    VectorSearchHit, VectorStore,
};
use assay_parser::{chunk_text, estimate_page_number, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

/// Minimum cosine similarity for a chunk to count as relevant.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.7;

pub struct VectorService {
    store: Arc<dyn VectorStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
    chunk_size: usize,
    overlap: usize,
}

impl VectorService {
    pub fn new(store: Arc<dyn VectorStore>, embeddings: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embeddings,
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }

    pub fn with_chunking(mut self, chunk_size: usize, overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.overlap = overlap;
        self
    }

    /// Chunk the document, embed every chunk, and upsert the points.
    /// Point ids derive from `(report id, chunk index)`, so re-ingesting a
    /// report overwrites its old points. Returns the number of chunks
    /// stored.
    pub async fn store_document(
        &self,
        report_id: ReportId,
        document: &ParsedDocument,
        entities: &ExtractedEntities,
    ) -> StageResult<u32> {
        let chunks = chunk_text(&document.full_text, self.chunk_size, self.overlap);
        if chunks.is_empty() {
            debug!(report_id = %report_id, "document produced no chunks");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embeddings.embed_batch(&texts).await?;

        let ticker = entities.primary_ticker();
        let title = document.title_or_default();
        let points: Vec<VectorPoint> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let mut payload = Map::new();
                payload.insert("report_id".into(), json!(report_id.0.to_string()));
                payload.insert("chunk_index".into(), json!(chunk.chunk_index));
                payload.insert("text".into(), json!(chunk.text));
                payload.insert(
                    "page_number".into(),
                    json!(estimate_page_number(chunk.start_char, &document.pages)),
                );
                payload.insert("title".into(), json!(title));
                if let Some(ticker) = &ticker {
                    payload.insert("company_ticker".into(), json!(ticker));
                }
                VectorPoint {
                    id: point_id(report_id, chunk.chunk_index).to_string(),
                    vector,
                    payload,
                }
            })
            .collect();

        let stored = points.len() as u32;
        self.store.upsert(points).await?;
        info!(report_id = %report_id, chunks = stored, "stored document vectors");
        Ok(stored)
    }

    /// Embed the query and return chunks above the similarity threshold,
    /// optionally restricted to one company's reports.
    pub async fn search_similar(
        &self,
        query: &str,
        limit: usize,
        ticker: Option<&str>,
    ) -> StageResult<Vec<VectorSearchHit>> {
        let vector = self.embeddings.embed(query).await?;
        let filter = ticker.map(|t| {
            let mut fields = Map::new();
            fields.insert("company_ticker".into(), Value::String(t.to_string()));
            fields
        });
        self.store
            .search(vector, limit, DEFAULT_SCORE_THRESHOLD, filter)
            .await
    }

    /// Remove every point belonging to the report.
    pub async fn delete_report(&self, report_id: ReportId) -> StageResult<u64> {
        self.store.delete_by_report(report_id).await
    }
}

/// Deterministic point id for a chunk of a report.
fn point_id(report_id: ReportId, chunk_index: u32) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{}:{}", report_id.0, chunk_index).as_bytes(),
    )
}

//! Storage trait abstractions: relational job store, graph store, vector
//! store.

use crate::context::GraphStats;
use crate::error::StageResult;
use crate::report::{ReportId, ReportJob, UploadOutcome};
use crate::status::ReportStatus;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Authoritative store of `ReportJob` rows.
///
/// `transition` is the single mutator of the status column and must be one
/// atomic write; the two parallel branch workers serialise here.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Create a job for the given upload, or return the existing job whose
    /// content hash matches (idempotent upload). The outcome says which of
    /// the two happened; exactly one caller ever sees `Created` for a given
    /// hash, even under concurrent duplicate uploads.
    async fn create_or_get_by_hash(
        &self,
        filename: &str,
        content_hash: &str,
    ) -> StageResult<UploadOutcome>;

    async fn get(&self, id: ReportId) -> StageResult<Option<ReportJob>>;

    async fn list(&self) -> StageResult<Vec<ReportJob>>;

    /// Move the job to `new_status`, recording `error` when failing.
    /// Rejects transitions the state machine disallows.
    async fn transition(
        &self,
        id: ReportId,
        new_status: ReportStatus,
        error: Option<String>,
    ) -> StageResult<()>;

    /// Record derived metadata (title, page count) after parsing.
    async fn update_metadata(
        &self,
        id: ReportId,
        title: Option<String>,
        page_count: u32,
    ) -> StageResult<()>;

    /// Fold branch statistics into the accumulated counters. Counts add up;
    /// they are never overwritten, so either branch may report first.
    async fn merge_branch_stats(
        &self,
        id: ReportId,
        graph: GraphStats,
        chunks_stored: u32,
    ) -> StageResult<()>;

    /// Remove the job row. Dependent graph/vector cleanup is composed by the
    /// caller.
    async fn delete(&self, id: ReportId) -> StageResult<()>;
}

/// Ad hoc structured queries against the knowledge graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Execute a read query, returning row maps keyed by the query's return
    /// aliases.
    async fn execute_read(&self, query: &str, params: Value) -> StageResult<Vec<Map<String, Value>>>;

    /// Execute a write query (MERGE/CREATE/DELETE), returning any rows it
    /// yields.
    async fn execute_write(&self, query: &str, params: Value)
        -> StageResult<Vec<Map<String, Value>>>;
}

/// One (vector, payload) pair for upsert.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Map<String, Value>,
}

/// One scored nearest-neighbor hit.
#[derive(Debug, Clone)]
pub struct VectorSearchHit {
    pub id: String,
    pub score: f32,
    pub payload: Map<String, Value>,
}

/// Nearest-neighbor vector store with metadata filtering.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent upsert of points by id.
    async fn upsert(&self, points: Vec<VectorPoint>) -> StageResult<()>;

    /// Nearest-neighbor search above a similarity threshold, optionally
    /// filtered by exact-match payload fields.
    async fn search(
        &self,
        vector: Vec<f32>,
        limit: usize,
        score_threshold: f32,
        filter: Option<Map<String, Value>>,
    ) -> StageResult<Vec<VectorSearchHit>>;

    /// Delete every point whose payload references the report.
    async fn delete_by_report(&self, report_id: ReportId) -> StageResult<u64>;
}

//! End-to-end ingestion runs over in-process backends: a real SQLite job
//! store and real graph/vector services sitting on recording test doubles.

use std::sync::Arc;

use assay_core::{
    GraphStore, ReportStatus, StageError, VectorPoint, VectorSearchHit, VectorStore,
};
use assay_extraction::ExtractionService;
use assay_llm::{MockEmbeddingProvider, MockGenerationProvider};
use assay_neo4j::{GraphWriter, VisualizationService};
use assay_parser::{content_hash, PlainTextParser};
use assay_pipeline::{IngestPipeline, PipelineConfig, PipelineDeps};
use assay_qdrant::VectorService;
use assay_sqlite::{create_report_store, SqlitePool};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

#[derive(Default)]
struct RecordingGraphStore {
    writes: Mutex<Vec<String>>,
    fail_writes: bool,
}

#[async_trait]
impl GraphStore for RecordingGraphStore {
    async fn execute_read(
        &self,
        _query: &str,
        _params: Value,
    ) -> Result<Vec<Map<String, Value>>, StageError> {
        Ok(Vec::new())
    }

    async fn execute_write(
        &self,
        query: &str,
        _params: Value,
    ) -> Result<Vec<Map<String, Value>>, StageError> {
        if self.fail_writes {
            return Err(StageError::Unrecoverable("graph store offline".into()));
        }
        self.writes.lock().push(query.to_string());
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct RecordingVectorStore {
    points: Mutex<Vec<VectorPoint>>,
    fail_upserts: bool,
}

#[async_trait]
impl VectorStore for RecordingVectorStore {
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), StageError> {
        if self.fail_upserts {
            return Err(StageError::Unrecoverable("vector store offline".into()));
        }
        self.points.lock().extend(points);
        Ok(())
    }

    async fn search(
        &self,
        _vector: Vec<f32>,
        _limit: usize,
        _score_threshold: f32,
        _filter: Option<Map<String, Value>>,
    ) -> Result<Vec<VectorSearchHit>, StageError> {
        Ok(Vec::new())
    }

    async fn delete_by_report(
        &self,
        _report_id: assay_core::ReportId,
    ) -> Result<u64, StageError> {
        Ok(0)
    }
}

const ENTITY_JSON: &str = r#"{
    "companies": [{"name": "Acme Corp", "ticker": "ACM", "industry": "Widgets"}],
    "industries": [{"name": "Widgets"}],
    "themes": [],
    "target_prices": [],
    "opinions": []
}"#;

const RELATIONSHIP_JSON: &str = r#"{"relationships": [{
    "source": {"entity_type": "Company", "identifier": "ACM"},
    "target": {"entity_type": "Industry", "identifier": "Widgets"},
    "relation_type": "BELONGS_TO",
    "confidence": 0.9
}]}"#;

const REPORT_TEXT: &[u8] = b"Acme Corp Q3 Outlook\n\nAcme Corp (ACM) leads the widget \
industry. We expect margins to widen through the second half.";

struct Harness {
    pipeline: IngestPipeline,
    graph_store: Arc<RecordingGraphStore>,
    vector_store: Arc<RecordingVectorStore>,
}

fn harness_on(pool: SqlitePool, fail_graph: bool, fail_vectors: bool) -> Harness {
    let store = create_report_store(pool);

    let provider = MockGenerationProvider::new();
    provider.push_response(ENTITY_JSON);
    provider.push_response(RELATIONSHIP_JSON);

    let graph_store = Arc::new(RecordingGraphStore {
        fail_writes: fail_graph,
        ..Default::default()
    });
    let vector_store = Arc::new(RecordingVectorStore {
        fail_upserts: fail_vectors,
        ..Default::default()
    });

    let deps = PipelineDeps {
        store,
        parser: Arc::new(PlainTextParser::new()),
        table_analyzer: None,
        extraction: Arc::new(ExtractionService::new(Arc::new(provider))),
        graph: Arc::new(GraphWriter::new(graph_store.clone())),
        vectors: Arc::new(VectorService::new(
            vector_store.clone(),
            Arc::new(MockEmbeddingProvider::with_dimensions(8)),
        )),
        visualization: Arc::new(VisualizationService::new(graph_store.clone())),
    };
    Harness {
        pipeline: IngestPipeline::new(deps, PipelineConfig::default()),
        graph_store,
        vector_store,
    }
}

fn harness() -> Harness {
    harness_on(SqlitePool::memory().unwrap(), false, false)
}

#[tokio::test]
async fn full_run_reaches_completed_with_both_branch_counters() {
    let h = harness();
    let handle = h
        .pipeline
        .submit("acme-q3.txt", REPORT_TEXT.to_vec())
        .await
        .unwrap();
    assert!(handle.started());
    let id = handle.report_id;
    handle.wait().await;

    let job = h.pipeline.store().get(id).await.unwrap().unwrap();
    assert_eq!(job.status, ReportStatus::Completed);
    assert!(job.error.is_none());
    assert_eq!(job.title.as_deref(), Some("Acme Corp Q3 Outlook"));
    assert!(job.entity_count > 0);
    assert!(job.vector_chunks > 0);

    assert!(!h.graph_store.writes.lock().is_empty());
    assert!(!h.vector_store.points.lock().is_empty());
}

#[tokio::test]
async fn duplicate_upload_resolves_to_the_same_report() {
    let h = harness();
    let first = h
        .pipeline
        .submit("acme-q3.txt", REPORT_TEXT.to_vec())
        .await
        .unwrap();
    let id = first.report_id;
    first.wait().await;

    let second = h
        .pipeline
        .submit("acme-q3-copy.txt", REPORT_TEXT.to_vec())
        .await
        .unwrap();
    assert_eq!(second.report_id, id);
    assert!(!second.started());
    assert_eq!(h.pipeline.store().list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_racing_a_pending_job_does_not_start_a_second_run() {
    let h = harness();
    // Register the row the way an in-flight upload would, before its run
    // has moved the job past pending.
    let hash = content_hash(REPORT_TEXT);
    let first = h
        .pipeline
        .store()
        .create_or_get_by_hash("acme-q3.txt", &hash)
        .await
        .unwrap();
    assert!(first.is_created());

    let second = h
        .pipeline
        .submit("acme-q3-copy.txt", REPORT_TEXT.to_vec())
        .await
        .unwrap();
    assert_eq!(second.report_id, first.job().id);
    assert!(!second.started());
    let job = h
        .pipeline
        .store()
        .get(second.report_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, ReportStatus::Pending);
}

#[tokio::test]
async fn vector_branch_failure_completes_degraded_with_graph_work_kept() {
    let h = harness_on(SqlitePool::memory().unwrap(), false, true);
    let handle = h
        .pipeline
        .submit("acme-q3.txt", REPORT_TEXT.to_vec())
        .await
        .unwrap();
    let id = handle.report_id;
    handle.wait().await;

    // A report with only a knowledge graph is still usable, so one dead
    // branch degrades the run instead of failing it.
    let job = h.pipeline.store().get(id).await.unwrap().unwrap();
    assert_eq!(job.status, ReportStatus::Completed);
    let error = job.error.unwrap();
    assert!(error.contains("vectors"), "error should name the branch: {error}");

    // The surviving branch's counters landed at the join.
    assert!(job.entity_count > 0);
    assert_eq!(job.vector_chunks, 0);
    assert!(!h.graph_store.writes.lock().is_empty());
}

#[tokio::test]
async fn graph_branch_failure_is_tagged_graph() {
    let h = harness_on(SqlitePool::memory().unwrap(), true, false);
    let handle = h
        .pipeline
        .submit("acme-q3.txt", REPORT_TEXT.to_vec())
        .await
        .unwrap();
    let id = handle.report_id;
    handle.wait().await;

    let job = h.pipeline.store().get(id).await.unwrap().unwrap();
    assert_eq!(job.status, ReportStatus::Completed);
    assert!(job.error.unwrap().contains("graph"));
    assert!(job.vector_chunks > 0);
}

#[tokio::test]
async fn both_branches_failing_fails_the_job() {
    let h = harness_on(SqlitePool::memory().unwrap(), true, true);
    let handle = h
        .pipeline
        .submit("acme-q3.txt", REPORT_TEXT.to_vec())
        .await
        .unwrap();
    let id = handle.report_id;
    handle.wait().await;

    let job = h.pipeline.store().get(id).await.unwrap().unwrap();
    assert_eq!(job.status, ReportStatus::Failed);
    let error = job.error.unwrap();
    assert!(error.contains("graph") && error.contains("vectors"));
    assert_eq!(job.entity_count, 0);
    assert_eq!(job.vector_chunks, 0);
}

#[tokio::test]
async fn failed_reports_can_be_retried_from_scratch() {
    // First pipeline: both stores broken, run fails outright.
    let pool = SqlitePool::memory().unwrap();
    let broken = harness_on(pool.clone(), true, true);
    let handle = broken
        .pipeline
        .submit("acme-q3.txt", REPORT_TEXT.to_vec())
        .await
        .unwrap();
    let id = handle.report_id;
    handle.wait().await;
    assert_eq!(
        broken.pipeline.store().get(id).await.unwrap().unwrap().status,
        ReportStatus::Failed
    );

    // Second pipeline over the same rows with healthy backends.
    let healthy = harness_on(pool, false, false);
    let retry = healthy.pipeline.retry(id, REPORT_TEXT.to_vec()).await.unwrap();
    retry.wait().await;

    let job = healthy.pipeline.store().get(id).await.unwrap().unwrap();
    assert_eq!(job.status, ReportStatus::Completed);
    assert!(job.error.is_none());
    assert!(job.vector_chunks > 0);
}

#[tokio::test]
async fn completed_reports_cannot_be_retried() {
    let h = harness();
    let handle = h
        .pipeline
        .submit("acme-q3.txt", REPORT_TEXT.to_vec())
        .await
        .unwrap();
    let id = handle.report_id;
    handle.wait().await;

    let err = h.pipeline.retry(id, REPORT_TEXT.to_vec()).await.unwrap_err();
    assert!(matches!(err, StageError::Unrecoverable(_)));
}

#[tokio::test]
async fn unparseable_bytes_fail_without_burning_retries() {
    let h = harness();
    let handle = h
        .pipeline
        .submit("garbage.bin", vec![0xff, 0xfe, 0x00, 0x01])
        .await
        .unwrap();
    let id = handle.report_id;
    handle.wait().await;

    let job = h.pipeline.store().get(id).await.unwrap().unwrap();
    assert_eq!(job.status, ReportStatus::Failed);
    assert!(job.error.is_some());
}

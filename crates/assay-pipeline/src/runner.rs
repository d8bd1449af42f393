//! The ingestion run: a status-reporting chain with one parallel fan-out.

use std::sync::Arc;

use assay_core::{
    BranchOutcome, BranchResult, BranchTag, GraphStats, PipelineContext, ReportId, ReportStatus,
    StageError, StageResult, UploadOutcome,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::deps::PipelineDeps;
use crate::retry::run_stage;

/// Handle to a spawned ingestion run. Dropping it detaches the run; the
/// status column in the report store remains the source of truth either way.
#[derive(Debug)]
pub struct RunHandle {
    pub report_id: ReportId,
    join: Option<JoinHandle<()>>,
}

impl RunHandle {
    /// True when this submission actually started a run (as opposed to
    /// deduplicating against an existing report).
    pub fn started(&self) -> bool {
        self.join.is_some()
    }

    /// Wait for the run to finish. Completion of the task says nothing about
    /// success; read the job status for that.
    pub async fn wait(self) {
        if let Some(join) = self.join {
            let _ = join.await;
        }
    }
}

/// Orchestrator for document ingestion.
///
/// Stage order: parse, analyze tables, extract entities, extract
/// relationships, then graph build and vector storage in parallel, then
/// visualization, then completion. Every stage reports its status through
/// the report store before doing work, and any stage failure (after the
/// bounded retry inside [`run_stage`]) moves the job to `failed` with the
/// error recorded.
pub struct IngestPipeline {
    deps: Arc<PipelineDeps>,
    config: PipelineConfig,
}

impl IngestPipeline {
    pub fn new(deps: PipelineDeps, config: PipelineConfig) -> Self {
        Self {
            deps: Arc::new(deps),
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn assay_core::ReportStore> {
        &self.deps.store
    }

    /// Register an upload and start ingesting it, unless a report with the
    /// same content hash already exists, in which case the existing job is
    /// returned untouched. Only the upload that created the row starts a
    /// run, so a duplicate racing an in-flight `Pending` job cannot start a
    /// second one.
    pub async fn submit(&self, filename: &str, bytes: Vec<u8>) -> StageResult<RunHandle> {
        let hash = assay_parser::content_hash(&bytes);
        match self
            .deps
            .store
            .create_or_get_by_hash(filename, &hash)
            .await?
        {
            UploadOutcome::Created(job) => Ok(self.spawn_run(job.id, bytes)),
            UploadOutcome::Existing(job) => {
                info!(
                    report_id = %job.id,
                    status = job.status.as_str(),
                    "duplicate upload, returning existing report"
                );
                Ok(RunHandle {
                    report_id: job.id,
                    join: None,
                })
            }
        }
    }

    /// Re-run a failed (or never-started) report from the beginning. Runs
    /// restart whole; there is no per-stage resumption.
    pub async fn retry(&self, id: ReportId, bytes: Vec<u8>) -> StageResult<RunHandle> {
        let job = self
            .deps
            .store
            .get(id)
            .await?
            .ok_or_else(|| StageError::Unrecoverable(format!("unknown report {id}")))?;
        match job.status {
            ReportStatus::Failed => {
                self.deps
                    .store
                    .transition(id, ReportStatus::Pending, None)
                    .await?;
            }
            ReportStatus::Pending => {}
            other => {
                return Err(StageError::Unrecoverable(format!(
                    "report {id} is {}, only failed or pending reports can be retried",
                    other.as_str()
                )));
            }
        }
        Ok(self.spawn_run(id, bytes))
    }

    /// Remove a report and its graph and vector footprint.
    pub async fn remove(&self, id: ReportId) -> StageResult<()> {
        self.deps.graph.delete_report_graph(id).await?;
        self.deps.vectors.delete_report(id).await?;
        self.deps.store.delete(id).await?;
        info!(report_id = %id, "report removed");
        Ok(())
    }

    fn spawn_run(&self, id: ReportId, bytes: Vec<u8>) -> RunHandle {
        let deps = Arc::clone(&self.deps);
        let config = self.config.clone();
        let join = tokio::spawn(async move {
            if let Err(err) = execute(&deps, &config, id, &bytes).await {
                error!(report_id = %id, error = %err, "ingestion failed");
                if let Err(transition_err) = deps
                    .store
                    .transition(id, ReportStatus::Failed, Some(err.to_string()))
                    .await
                {
                    error!(
                        report_id = %id,
                        error = %transition_err,
                        "could not record failure status"
                    );
                }
            }
        });
        RunHandle {
            report_id: id,
            join: Some(join),
        }
    }
}

async fn execute(
    deps: &PipelineDeps,
    config: &PipelineConfig,
    id: ReportId,
    bytes: &[u8],
) -> StageResult<()> {
    let retries = config.max_stage_retries;
    let timeout = config.stage_timeout;

    deps.store.transition(id, ReportStatus::Parsing, None).await?;
    let mut document = run_stage("parse", retries, timeout, || deps.parser.parse(bytes)).await?;
    deps.store
        .update_metadata(id, document.metadata.title.clone(), document.metadata.page_count)
        .await?;

    if let Some(analyzer) = deps
        .table_analyzer
        .as_ref()
        .filter(|_| !config.skip_table_analysis)
    {
        deps.store
            .transition(id, ReportStatus::AnalyzingTables, None)
            .await?;
        let mut enriched = false;
        for page in document.pages.iter_mut().filter(|p| p.has_tables) {
            // Page-local failure: log and move on, the page text survives.
            match analyzer.analyze_page(&page.text, page.page_number).await {
                Ok(Some(summary)) => {
                    page.text.push_str("\n\n");
                    page.text.push_str(&summary);
                    enriched = true;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        report_id = %id,
                        page = page.page_number,
                        error = %err,
                        "table analysis failed for page"
                    );
                }
            }
        }
        if enriched {
            document.refresh_full_text();
        }
    }

    deps.store
        .transition(id, ReportStatus::ExtractingEntities, None)
        .await?;
    let entities = run_stage("extract_entities", retries, timeout, || {
        deps.extraction.extract_entities(&document.full_text)
    })
    .await?;

    deps.store
        .transition(id, ReportStatus::ExtractingRelationships, None)
        .await?;
    let relationships = run_stage("extract_relationships", retries, timeout, || {
        deps.extraction
            .extract_relationships(&document.full_text, &entities)
    })
    .await?;

    let ctx = PipelineContext {
        report_id: id,
        document,
        entities,
        relationships,
    };
    let title = ctx.document.title_or_default();

    // Fan-out: both branches run to completion regardless of the other's
    // outcome, and each reports its own status and tags its own result.
    let graph_branch = async {
        let result = async {
            deps.store
                .transition(id, ReportStatus::BuildingGraph, None)
                .await?;
            run_stage("build_graph", retries, timeout, || {
                deps.graph
                    .build_graph(id, &title, &ctx.entities, &ctx.relationships)
            })
            .await
        }
        .await;
        BranchOutcome {
            tag: BranchTag::Graph,
            result: result.map(BranchResult::Graph),
        }
    };
    let vector_branch = async {
        let result = async {
            deps.store
                .transition(id, ReportStatus::StoringEmbeddings, None)
                .await?;
            run_stage("store_vectors", retries, timeout, || {
                deps.vectors.store_document(id, &ctx.document, &ctx.entities)
            })
            .await
        }
        .await;
        BranchOutcome {
            tag: BranchTag::Vectors,
            result: result.map(|chunks_stored| BranchResult::Vectors { chunks_stored }),
        }
    };
    let (graph_outcome, vector_outcome) = tokio::join!(graph_branch, vector_branch);

    // Join: fold whatever succeeded into the counters first, so a partial
    // failure still records the surviving branch's work. The join matches on
    // branch identity, never on completion order.
    let outcomes = [graph_outcome, vector_outcome];
    let mut stats = GraphStats::default();
    let mut chunks = 0u32;
    for outcome in &outcomes {
        stats = stats.merge(outcome.graph_stats());
        chunks += outcome.chunks_stored();
    }
    deps.store.merge_branch_stats(id, stats, chunks).await?;

    let failures: Vec<&BranchOutcome> = outcomes
        .iter()
        .filter(|outcome| outcome.result.is_err())
        .collect();
    // One failed branch degrades the report, it does not sink it: a report
    // with only a graph or only a vector index is still queryable. Both
    // branches failing leaves nothing usable.
    let branch_error = if let Some(first) = failures.first() {
        let message = failures
            .iter()
            .map(|outcome| {
                let detail = match &outcome.result {
                    Err(err) => err.to_string(),
                    Ok(_) => String::new(),
                };
                format!("{}: {detail}", outcome.tag.name())
            })
            .collect::<Vec<_>>()
            .join("; ");
        if failures.len() == outcomes.len() {
            return Err(StageError::BranchFailed {
                branch: first.tag.name(),
                message,
            });
        }
        warn!(report_id = %id, error = %message, "branch failed, completing degraded");
        Some(message)
    } else {
        None
    };

    deps.store
        .transition(id, ReportStatus::GeneratingVisualization, branch_error)
        .await?;
    // Visualization is non-critical: a failure here downgrades to a warning
    // and the report still completes.
    match deps.visualization.snapshot(Some(id)).await {
        Ok(graph) => {
            debug!(
                report_id = %id,
                nodes = graph.nodes.len(),
                relationships = graph.relationships.len(),
                "visualization snapshot ready"
            );
        }
        Err(err) => {
            warn!(report_id = %id, error = %err, "visualization failed, completing anyway");
        }
    }

    deps.store
        .transition(id, ReportStatus::Completed, None)
        .await?;
    info!(
        report_id = %id,
        entities = stats.nodes_created,
        relationships = stats.relationships_created,
        chunks,
        "ingestion complete"
    );
    Ok(())
}

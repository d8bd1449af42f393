//! Dependency bundle for a pipeline instance.

use std::sync::Arc;

use assay_core::{DocumentParser, ReportStore, TableAnalyzer};
use assay_extraction::ExtractionService;
use assay_neo4j::{GraphWriter, VisualizationService};
use assay_qdrant::VectorService;

/// Everything a pipeline run touches, injected at construction. There is no
/// ambient registry to reach into; swapping any collaborator (most often for
/// an in-process test double underneath the real services) is a matter of
/// building a different bundle.
pub struct PipelineDeps {
    pub store: Arc<dyn ReportStore>,
    pub parser: Arc<dyn DocumentParser>,
    /// Optional pass; `None` disables table analysis regardless of config.
    pub table_analyzer: Option<Arc<dyn TableAnalyzer>>,
    pub extraction: Arc<ExtractionService>,
    pub graph: Arc<GraphWriter>,
    pub vectors: Arc<VectorService>,
    pub visualization: Arc<VisualizationService>,
}
